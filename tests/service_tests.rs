mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;
use roster::config::Config;
use roster::db::{Store, StoreCounts, unique_violation};
use roster::models::{AccountPatch, MemberPatch, NewAccount, NewMember, Role};
use roster::services::{
    AuthError, AuthService, AvatarService, AvatarUpload, JwtTokenIssuer, MemberError,
    MemberLookup, MemberService, Registration, SeaOrmAuthService, SeaOrmMemberService,
    TokenIssuer,
};

use common::{PASSWORD, test_config};

struct Harness {
    config: Config,
    store: Store,
    tokens: Arc<JwtTokenIssuer>,
    auth: Arc<SeaOrmAuthService>,
    members: SeaOrmMemberService,
}

async fn harness() -> Harness {
    let config = test_config();
    let store = Store::new(&config.general.database_path)
        .await
        .expect("failed to open store");
    let tokens = Arc::new(JwtTokenIssuer::new(
        config.security.jwt_secret.as_bytes(),
        Algorithm::HS256,
        Duration::minutes(30),
    ));
    let auth = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        tokens.clone(),
        config.security.clone(),
    ));
    let members = SeaOrmMemberService::new(store.clone());

    Harness {
        config,
        store,
        tokens,
        auth,
        members,
    }
}

fn registration(username: &str, email: &str, registration_number: &str) -> Registration {
    Registration {
        account: NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
            name: None,
            role: Role::User,
        },
        member: NewMember {
            registration_number: registration_number.to_string(),
            department: "Engineering".to_string(),
            address: "1 Main St".to_string(),
            city: "Delft".to_string(),
            country: "NL".to_string(),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_register_twice_leaves_one_pair() {
    let h = harness().await;

    let created = h
        .auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();
    let member = created.member.expect("registration creates a profile");
    assert!(member.is_profile_complete);
    assert_eq!(member.user_id, created.account.id);

    let err = h
        .auth
        .register(registration("ada", "ada2@example.com", "R-2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)));

    assert_eq!(
        h.store.counts().await.unwrap(),
        StoreCounts {
            users: 1,
            members: 1,
            admins: 0,
        }
    );
}

#[tokio::test]
async fn test_concurrent_registrations_with_same_email() {
    let h = harness().await;

    let first = h
        .auth
        .register(registration("ada", "shared@example.com", "R-1"));
    let second = h
        .auth
        .register(registration("bob", "shared@example.com", "R-2"));
    let (first, second) = tokio::join!(first, second);

    let results = [first, second];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AuthError::Conflict(_))))
        .count();

    assert_eq!(ok, 1);
    assert_eq!(conflicts, 1);

    let counts = h.store.counts().await.unwrap();
    assert_eq!(counts.users, 1);
    assert_eq!(counts.members, 1);
}

#[tokio::test]
async fn test_store_unique_violation_is_reported() {
    let h = harness().await;
    h.auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();

    // Bypass the service pre-checks so the constraint itself fires.
    let Registration { account, member } = registration("ada", "other@example.com", "R-2");
    let err = h
        .store
        .create_user_with_member(account, "hash".to_string(), member)
        .await
        .unwrap_err();

    let message = unique_violation(&err).expect("unique violation");
    assert!(message.contains("username"));

    // Nothing from the failed transaction is left behind.
    assert_eq!(h.store.counts().await.unwrap().members, 1);
}

#[tokio::test]
async fn test_failed_member_insert_rolls_back_account() {
    let h = harness().await;
    h.auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();

    // Fresh username and email, reused registration number: the account row
    // goes in first and the member insert is the statement that fails.
    let Registration { account, member } = registration("bob", "bob@example.com", "R-1");
    let err = h
        .store
        .create_user_with_member(account, "hash".to_string(), member)
        .await
        .unwrap_err();

    let message = unique_violation(&err).expect("unique violation");
    assert!(message.contains("registration_number"));

    assert!(h.store.get_user_by_username("bob").await.unwrap().is_none());
    assert_eq!(
        h.store.counts().await.unwrap(),
        StoreCounts {
            users: 1,
            members: 1,
            admins: 0,
        }
    );
}

#[tokio::test]
async fn test_authenticate_then_authorize() {
    let h = harness().await;
    h.auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();

    let login = h.auth.authenticate("ada", PASSWORD).await.unwrap();
    assert_eq!(login.token_type, "bearer");
    assert_eq!(h.auth.authorize(&login.access_token).unwrap(), "ada");

    let wrong = h.auth.authenticate("ada", "wrong").await.unwrap_err();
    let unknown = h.auth.authenticate("nobody", PASSWORD).await.unwrap_err();
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert!(matches!(unknown, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let h = harness().await;

    let stale = h
        .tokens
        .issue_at("ada", Utc::now() - Duration::minutes(31))
        .unwrap();
    assert!(matches!(
        h.auth.authorize(&stale.access_token),
        Err(AuthError::TokenExpired)
    ));

    let fresh = h.tokens.issue("ada").unwrap();
    assert_eq!(h.tokens.verify(&fresh.access_token).unwrap(), "ada");
}

#[tokio::test]
async fn test_require_role() {
    let h = harness().await;
    h.auth
        .register(registration("user", "user@example.com", "R-1"))
        .await
        .unwrap();
    let mut admin = registration("boss", "boss@example.com", "R-2");
    admin.account.role = Role::Admin;
    h.auth.register(admin).await.unwrap();

    let user_token = h.auth.authenticate("user", PASSWORD).await.unwrap();
    assert!(matches!(
        h.auth
            .require_role(&user_token.access_token, Role::Admin)
            .await,
        Err(AuthError::Forbidden(Role::Admin))
    ));

    let admin_token = h.auth.authenticate("boss", PASSWORD).await.unwrap();
    let account = h
        .auth
        .require_role(&admin_token.access_token, Role::Admin)
        .await
        .unwrap();
    assert_eq!(account.username, "boss");

    let listed = h.auth.list_accounts(0, 100).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(h.store.counts().await.unwrap().admins, 1);
}

#[tokio::test]
async fn test_update_account_conflict_changes_nothing() {
    let h = harness().await;
    let ada = h
        .auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();
    h.auth
        .register(registration("bob", "bob@example.com", "R-2"))
        .await
        .unwrap();

    let patch = AccountPatch {
        name: Some("Ada".to_string()),
        email: Some("bob@example.com".to_string()),
        ..Default::default()
    };
    let err = h
        .auth
        .update_account(&ada.account.id, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)));

    let unchanged = h.auth.get_account(&ada.account.id).await.unwrap();
    assert_eq!(unchanged.account.name, None);
    assert_eq!(unchanged.account.email, "ada@example.com");

    let patch = AccountPatch {
        name: Some("Ada".to_string()),
        role: Some(Role::Admin),
        ..Default::default()
    };
    let updated = h
        .auth
        .update_account(&ada.account.id, patch)
        .await
        .unwrap();
    assert_eq!(updated.account.name.as_deref(), Some("Ada"));
    assert_eq!(updated.account.role, Role::Admin);
    assert!(updated.account.updated_at >= ada.account.updated_at);
}

#[tokio::test]
async fn test_city_patch_sets_complete_flag() {
    let h = harness().await;
    let ada = h
        .auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();
    let registered = ada.member.unwrap();

    h.members.delete_member(&registered.id).await.unwrap();
    let mut incomplete = registration("", "", "R-9").member;
    incomplete.is_profile_complete = false;
    let created = h
        .members
        .create_member(&ada.account.id, incomplete)
        .await
        .unwrap();
    assert!(!created.member.is_profile_complete);

    let patch = MemberPatch {
        city: Some("X".to_string()),
        ..Default::default()
    };
    let updated = h
        .members
        .update_member(&MemberLookup::Owner(ada.account.id.clone()), patch)
        .await
        .unwrap();

    assert_eq!(updated.member.city, "X");
    assert_eq!(updated.member.department, created.member.department);
    assert_eq!(updated.member.address, created.member.address);
    assert_eq!(updated.member.registration_number, "R-9");
    assert!(updated.member.is_profile_complete);
}

#[tokio::test]
async fn test_lookup_by_id_and_owner_agree() {
    let h = harness().await;
    let ada = h
        .auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();
    let member_id = ada.member.unwrap().id;

    let by_id = h
        .members
        .get_member(&MemberLookup::Id(member_id.clone()))
        .await
        .unwrap();
    let by_owner = h
        .members
        .get_member(&MemberLookup::Owner(ada.account.id.clone()))
        .await
        .unwrap();
    assert_eq!(by_id.member, by_owner.member);
    assert_eq!(by_id.account.username, "ada");

    assert!(matches!(
        h.members
            .get_member(&MemberLookup::Id("missing".to_string()))
            .await,
        Err(MemberError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_account_then_owner_lookup_fails() {
    let h = harness().await;
    let ada = h
        .auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();

    h.auth.delete_account(&ada.account.id).await.unwrap();

    assert!(matches!(
        h.members
            .get_member(&MemberLookup::Owner(ada.account.id.clone()))
            .await,
        Err(MemberError::NotFound(_))
    ));
    assert_eq!(
        h.store.counts().await.unwrap(),
        StoreCounts {
            users: 0,
            members: 0,
            admins: 0,
        }
    );

    assert!(matches!(
        h.auth.delete_account(&ada.account.id).await,
        Err(AuthError::UserNotFound)
    ));
}

#[tokio::test]
async fn test_avatar_attach_keeps_flag_and_records_path() {
    let h = harness().await;
    let ada = h
        .auth
        .register(registration("ada", "ada@example.com", "R-1"))
        .await
        .unwrap();
    let avatars = AvatarService::new(h.store.clone(), &h.config.uploads);

    let reference = avatars
        .attach(
            &ada.account,
            AvatarUpload {
                content_type: "image/jpeg".to_string(),
                file_name: Some("face.jpg".to_string()),
                bytes: b"jpeg".to_vec(),
            },
        )
        .await
        .unwrap();
    assert!(reference.starts_with("/uploads/avatars/"));
    assert!(reference.ends_with(".jpg"));

    let member = h
        .members
        .get_member(&MemberLookup::Owner(ada.account.id.clone()))
        .await
        .unwrap()
        .member;
    assert_eq!(member.avatar_url.as_deref(), Some(reference.as_str()));
    assert!(member.is_profile_complete);

    // No profile, no upload.
    h.members.delete_member(&member.id).await.unwrap();
    let err = avatars
        .attach(
            &ada.account,
            AvatarUpload {
                content_type: "image/png".to_string(),
                file_name: None,
                bytes: b"png".to_vec(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MemberError::NotFound(_)));

    std::fs::remove_dir_all(&h.config.uploads.upload_dir).ok();
}
