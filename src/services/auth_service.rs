//! Domain service for credentials, sessions and account management.
//!
//! Handles registration, login, bearer-token verification, role checks and
//! account updates/deletion.

use thiserror::Error;

use crate::models::{Account, AccountPatch, AccountWithMember, NewAccount, NewMember, Role};

/// Errors specific to authentication and account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username and wrong password are deliberately indistinguishable.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    /// The token was valid but its account no longer exists.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} access required")]
    Forbidden(Role),

    #[error("User not found")]
    UserNotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Everything needed to open an account: credentials plus the member
/// profile that is created alongside it.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: NewAccount,
    pub member: NewMember,
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: AccountWithMember,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account and its member profile atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the username, email or registration
    /// number is taken, and [`AuthError::Validation`] for blank required fields.
    async fn register(&self, registration: Registration) -> Result<AccountWithMember, AuthError>;

    /// Verifies credentials and issues a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<LoginResult, AuthError>;

    /// Validates a bearer token and returns its subject (username).
    fn authorize(&self, token: &str) -> Result<String, AuthError>;

    /// Resolves a bearer token to its account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] when the account no longer exists.
    async fn current_account(&self, token: &str) -> Result<Account, AuthError>;

    /// Resolves a bearer token and requires the account to hold `role`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Forbidden`] on role mismatch.
    async fn require_role(&self, token: &str, role: Role) -> Result<Account, AuthError>;

    /// Gets an account and its member profile.
    async fn get_account(&self, id: &str) -> Result<AccountWithMember, AuthError>;

    /// Applies a partial update to an account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the new username or email is taken.
    async fn update_account(
        &self,
        id: &str,
        patch: AccountPatch,
    ) -> Result<AccountWithMember, AuthError>;

    /// Lists accounts with their member profiles.
    async fn list_accounts(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<AccountWithMember>, AuthError>;

    /// Deletes an account together with its member profile.
    async fn delete_account(&self, id: &str) -> Result<(), AuthError>;
}
