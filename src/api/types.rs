use serde::{Deserialize, Serialize};

use crate::models::{
    Account, AccountPatch, AccountWithMember, Member, MemberPatch, MemberWithAccount, NewAccount,
    NewMember, Role,
};
use crate::services::{LoginResult, Registration};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub id: String,
    pub user_id: String,
    pub registration_number: String,
    pub department: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub is_profile_complete: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Member> for MemberDto {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            user_id: member.user_id,
            registration_number: member.registration_number,
            department: member.department,
            address: member.address,
            city: member.city,
            country: member.country,
            phone: member.phone,
            avatar_url: member.avatar_url,
            bio: member.bio,
            is_profile_complete: member.is_profile_complete,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

/// Account fields embedded in member responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryDto {
    pub id: String,
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

impl From<Account> for UserSummaryDto {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            username: account.username,
            email: account.email,
            role: account.role,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub id: String,
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
    pub member: Option<MemberDto>,
}

impl From<AccountWithMember> for AccountDto {
    fn from(value: AccountWithMember) -> Self {
        let AccountWithMember { account, member } = value;
        Self {
            id: account.id,
            name: account.name,
            username: account.username,
            email: account.email,
            role: account.role,
            created_at: account.created_at,
            updated_at: account.updated_at,
            member: member.map(MemberDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberWithUserDto {
    #[serde(flatten)]
    pub member: MemberDto,
    pub user: UserSummaryDto,
}

impl From<MemberWithAccount> for MemberWithUserDto {
    fn from(value: MemberWithAccount) -> Self {
        Self {
            member: value.member.into(),
            user: value.account.into(),
        }
    }
}

/// OAuth2-style token response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: AccountDto,
}

impl From<LoginResult> for TokenResponse {
    fn from(login: LoginResult) -> Self {
        Self {
            access_token: login.access_token,
            token_type: login.token_type.to_string(),
            user: login.user.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub message: String,
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

// ============================================================================
// Requests
// ============================================================================

/// Registration payload. Missing required strings deserialize as empty and
/// are rejected by validation rather than by the extractor.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub name: Option<String>,
    pub role: Option<Role>,
    #[serde(default)]
    pub registration_number: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Self {
            account: NewAccount {
                username: req.username,
                email: req.email,
                password: req.password,
                name: req.name,
                role: req.role.unwrap_or_default(),
            },
            member: NewMember {
                registration_number: req.registration_number,
                department: req.department,
                address: req.address,
                city: req.city,
                country: req.country,
                phone: req.phone,
                avatar_url: None,
                bio: req.bio,
                is_profile_complete: true,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl From<UpdateAccountRequest> for AccountPatch {
    fn from(req: UpdateAccountRequest) -> Self {
        Self {
            username: req.username,
            password: req.password,
            name: req.name,
            email: req.email,
            role: req.role,
        }
    }
}

/// Self-service account update. Role is not accepted here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSelfRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<UpdateSelfRequest> for AccountPatch {
    fn from(req: UpdateSelfRequest) -> Self {
        Self {
            username: req.username,
            password: req.password,
            name: req.name,
            email: req.email,
            role: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub registration_number: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub is_profile_complete: bool,
}

impl CreateMemberRequest {
    #[must_use]
    pub fn into_parts(self) -> (String, NewMember) {
        (
            self.user_id,
            NewMember {
                registration_number: self.registration_number,
                department: self.department,
                address: self.address,
                city: self.city,
                country: self.country,
                phone: self.phone,
                avatar_url: self.avatar_url,
                bio: self.bio,
                is_profile_complete: self.is_profile_complete,
            },
        )
    }
}

/// Member patch. Absent and `null` fields are both left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub registration_number: Option<String>,
    pub department: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

impl From<UpdateMemberRequest> for MemberPatch {
    fn from(req: UpdateMemberRequest) -> Self {
        Self {
            registration_number: req.registration_number,
            department: req.department,
            address: req.address,
            city: req.city,
            country: req.country,
            phone: req.phone,
            avatar_url: req.avatar_url,
            bio: req.bio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_with_user_is_flat_camel_case() {
        let dto = MemberWithUserDto {
            member: MemberDto {
                id: "m1".into(),
                user_id: "u1".into(),
                registration_number: "R-1".into(),
                department: "Eng".into(),
                address: "1 Main St".into(),
                city: "Delft".into(),
                country: "NL".into(),
                phone: None,
                avatar_url: None,
                bio: None,
                is_profile_complete: true,
                created_at: "2025-01-01T00:00:00Z".into(),
                updated_at: "2025-01-01T00:00:00Z".into(),
            },
            user: UserSummaryDto {
                id: "u1".into(),
                name: None,
                username: "ada".into(),
                email: "ada@example.com".into(),
                role: Role::Admin,
                created_at: "2025-01-01T00:00:00Z".into(),
            },
        };

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["registrationNumber"], "R-1");
        assert_eq!(json["isProfileComplete"], true);
        assert_eq!(json["user"]["username"], "ada");
        assert_eq!(json["user"]["role"], "ADMIN");
        assert!(json.get("member").is_none());
    }

    #[test]
    fn test_register_request_defaults_role() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "pw",
        }))
        .unwrap();

        let registration = Registration::from(req);
        assert_eq!(registration.account.role, Role::User);
        assert_eq!(
            registration.member.missing_required(),
            vec!["registration_number", "department", "address", "city", "country"]
        );
    }

    #[test]
    fn test_null_patch_fields_are_absent() {
        let req: UpdateMemberRequest =
            serde_json::from_value(serde_json::json!({"city": "X", "bio": null})).unwrap();
        let patch = MemberPatch::from(req);
        assert_eq!(patch.city.as_deref(), Some("X"));
        assert!(patch.bio.is_none());
        assert!(patch.department.is_none());
    }
}
