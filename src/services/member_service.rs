//! Domain service for member profiles.
//!
//! A member profile belongs to exactly one account. Lookups go either by the
//! profile's own id or by the owning account's id; both resolve through the
//! same code path so the two entry points cannot drift apart.

use thiserror::Error;

use crate::models::{MemberPatch, MemberWithAccount, NewMember};

/// Errors specific to member profile operations.
#[derive(Debug, Error)]
pub enum MemberError {
    #[error("{0}")]
    NotFound(String),

    /// The profile exists but its owning account does not.
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

impl From<sea_orm::DbErr> for MemberError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for MemberError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// How to find the member profile an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberLookup {
    /// By the profile's own id.
    Id(String),
    /// By the id of the owning account.
    Owner(String),
}

/// Domain service trait for member profiles.
#[async_trait::async_trait]
pub trait MemberService: Send + Sync {
    /// Creates a profile for an existing account that has none.
    ///
    /// # Errors
    ///
    /// Returns [`MemberError::Conflict`] if the account already has a profile
    /// or the registration number is taken.
    async fn create_member(
        &self,
        user_id: &str,
        member: NewMember,
    ) -> Result<MemberWithAccount, MemberError>;

    /// Gets a profile joined with its account.
    async fn get_member(&self, lookup: &MemberLookup) -> Result<MemberWithAccount, MemberError>;

    /// Lists profiles joined with their accounts.
    async fn list_members(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<MemberWithAccount>, MemberError>;

    /// Applies the present fields of `patch` and marks the profile complete.
    async fn update_member(
        &self,
        lookup: &MemberLookup,
        patch: MemberPatch,
    ) -> Result<MemberWithAccount, MemberError>;

    /// Deletes a profile, leaving its account in place.
    async fn delete_member(&self, id: &str) -> Result<(), MemberError>;
}
