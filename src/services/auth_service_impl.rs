//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{Store, unique_violation};
use crate::models::{Account, AccountPatch, AccountWithMember, Role};
use crate::services::auth_service::{AuthError, AuthService, LoginResult, Registration};
use crate::services::password::{hash_password_blocking, verify_password_blocking};
use crate::services::token::{TOKEN_TYPE, TokenIssuer};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: Arc<dyn TokenIssuer>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, tokens: Arc<dyn TokenIssuer>, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }

    async fn with_member(&self, account: Account) -> Result<AccountWithMember, AuthError> {
        let member = self.store.get_member_by_user(&account.id).await?;
        Ok(AccountWithMember { account, member })
    }

    fn validate_registration(registration: &Registration) -> Result<(), AuthError> {
        let account = &registration.account;
        if account.username.trim().is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }
        if account.email.trim().is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }
        if account.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        let missing = registration.member.missing_required();
        if !missing.is_empty() {
            return Err(AuthError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

/// Human-readable conflict for a database unique-constraint message.
pub(crate) fn describe_violation(message: &str) -> String {
    if message.contains("username") {
        "Username already registered".to_string()
    } else if message.contains("email") {
        "Email already registered".to_string()
    } else if message.contains("registration_number") {
        "Registration number already registered".to_string()
    } else if message.contains("user_id") {
        "User already has a member profile".to_string()
    } else {
        "Record already exists".to_string()
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: Registration) -> Result<AccountWithMember, AuthError> {
        Self::validate_registration(&registration)?;
        let Registration {
            account,
            mut member,
        } = registration;

        if self.store.username_in_use(&account.username, None).await? {
            return Err(AuthError::Conflict("Username already registered".to_string()));
        }
        if self.store.email_in_use(&account.email, None).await? {
            return Err(AuthError::Conflict("Email already registered".to_string()));
        }
        if self
            .store
            .registration_number_in_use(&member.registration_number, None)
            .await?
        {
            return Err(AuthError::Conflict(
                "Registration number already registered".to_string(),
            ));
        }

        let password_hash = hash_password_blocking(&account.password, &self.security).await?;

        // Registration collects every required field up front.
        member.is_profile_complete = true;

        let (account, member) = self
            .store
            .create_user_with_member(account, password_hash, member)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(message) => AuthError::Conflict(describe_violation(&message)),
                None => AuthError::from(e),
            })?;

        info!(username = %account.username, role = %account.role, "Registered account");

        Ok(AccountWithMember {
            account,
            member: Some(member),
        })
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResult, AuthError> {
        let Some((account, password_hash)) = self.store.get_user_with_password(username).await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password, &password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&account.username)?;

        Ok(LoginResult {
            access_token: token.access_token,
            token_type: TOKEN_TYPE,
            user: self.with_member(account).await?,
        })
    }

    fn authorize(&self, token: &str) -> Result<String, AuthError> {
        self.tokens.verify(token)
    }

    async fn current_account(&self, token: &str) -> Result<Account, AuthError> {
        let username = self.authorize(token)?;

        self.store
            .get_user_by_username(&username)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    async fn require_role(&self, token: &str, role: Role) -> Result<Account, AuthError> {
        let account = self.current_account(token).await?;

        if account.role != role {
            return Err(AuthError::Forbidden(role));
        }

        Ok(account)
    }

    async fn get_account(&self, id: &str) -> Result<AccountWithMember, AuthError> {
        let account = self
            .store
            .get_user(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.with_member(account).await
    }

    async fn update_account(
        &self,
        id: &str,
        patch: AccountPatch,
    ) -> Result<AccountWithMember, AuthError> {
        let patch = patch.normalized();

        let current = self
            .store
            .get_user(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if let Some(username) = &patch.username
            && self.store.username_in_use(username, Some(id)).await?
        {
            return Err(AuthError::Conflict("Username already taken".to_string()));
        }
        if let Some(email) = &patch.email
            && self.store.email_in_use(email, Some(id)).await?
        {
            return Err(AuthError::Conflict("Email already taken".to_string()));
        }

        let password_hash = match &patch.password {
            Some(password) => Some(hash_password_blocking(password, &self.security).await?),
            None => None,
        };

        let new_role = patch.role;
        let account = self
            .store
            .update_user(id, patch, password_hash)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(message) => AuthError::Conflict(describe_violation(&message)),
                None => AuthError::from(e),
            })?
            .ok_or(AuthError::UserNotFound)?;

        if let Some(role) = new_role
            && role != current.role
        {
            info!(username = %account.username, from = %current.role, to = %role, "Changed account role");
        }

        self.with_member(account).await
    }

    async fn list_accounts(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<AccountWithMember>, AuthError> {
        let rows = self.store.list_users_with_members(offset, limit).await?;

        Ok(rows
            .into_iter()
            .map(|(account, member)| AccountWithMember { account, member })
            .collect())
    }

    async fn delete_account(&self, id: &str) -> Result<(), AuthError> {
        if !self.store.delete_user(id).await? {
            return Err(AuthError::UserNotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_violation() {
        assert_eq!(
            describe_violation("UNIQUE constraint failed: users.email"),
            "Email already registered"
        );
        assert_eq!(
            describe_violation("UNIQUE constraint failed: users.username"),
            "Username already registered"
        );
        assert_eq!(
            describe_violation("UNIQUE constraint failed: members.registration_number"),
            "Registration number already registered"
        );
        assert_eq!(describe_violation("something else"), "Record already exists");
    }
}
