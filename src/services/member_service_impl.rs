//! `SeaORM` implementation of the `MemberService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{Store, unique_violation};
use crate::models::{Member, MemberPatch, MemberWithAccount, NewMember};
use crate::services::auth_service_impl::describe_violation;
use crate::services::member_service::{MemberError, MemberLookup, MemberService};

pub struct SeaOrmMemberService {
    store: Store,
}

impl SeaOrmMemberService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn resolve(&self, lookup: &MemberLookup) -> Result<Member, MemberError> {
        match lookup {
            MemberLookup::Id(id) => self
                .store
                .get_member(id)
                .await?
                .ok_or_else(|| MemberError::NotFound("Member not found".to_string())),
            MemberLookup::Owner(user_id) => self
                .store
                .get_member_by_user(user_id)
                .await?
                .ok_or_else(|| MemberError::NotFound("Member profile not found".to_string())),
        }
    }

    async fn with_account(&self, member: Member) -> Result<MemberWithAccount, MemberError> {
        let account = self
            .store
            .get_user(&member.user_id)
            .await?
            .ok_or(MemberError::UserNotFound)?;

        Ok(MemberWithAccount { member, account })
    }
}

fn conflict_or_internal(err: anyhow::Error) -> MemberError {
    match unique_violation(&err) {
        Some(message) => MemberError::Conflict(describe_violation(&message)),
        None => MemberError::from(err),
    }
}

#[async_trait]
impl MemberService for SeaOrmMemberService {
    async fn create_member(
        &self,
        user_id: &str,
        member: NewMember,
    ) -> Result<MemberWithAccount, MemberError> {
        let missing = member.missing_required();
        if !missing.is_empty() {
            return Err(MemberError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let account = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(MemberError::UserNotFound)?;

        if self.store.get_member_by_user(user_id).await?.is_some() {
            return Err(MemberError::Conflict(
                "User already has a member profile".to_string(),
            ));
        }
        if self
            .store
            .registration_number_in_use(&member.registration_number, None)
            .await?
        {
            return Err(MemberError::Conflict(
                "Registration number already registered".to_string(),
            ));
        }

        let member = self
            .store
            .create_member(user_id, member)
            .await
            .map_err(conflict_or_internal)?;

        info!(member_id = %member.id, username = %account.username, "Created member profile");

        Ok(MemberWithAccount { member, account })
    }

    async fn get_member(&self, lookup: &MemberLookup) -> Result<MemberWithAccount, MemberError> {
        let member = self.resolve(lookup).await?;
        self.with_account(member).await
    }

    async fn list_members(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<MemberWithAccount>, MemberError> {
        let rows = self.store.list_members_with_users(offset, limit).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(member, account)| {
                account.map(|account| MemberWithAccount { member, account })
            })
            .collect())
    }

    async fn update_member(
        &self,
        lookup: &MemberLookup,
        patch: MemberPatch,
    ) -> Result<MemberWithAccount, MemberError> {
        let member = self.resolve(lookup).await?;

        if let Some(number) = &patch.registration_number
            && number != &member.registration_number
            && self
                .store
                .registration_number_in_use(number, Some(&member.id))
                .await?
        {
            return Err(MemberError::Conflict(
                "Registration number already registered".to_string(),
            ));
        }

        let updated = self
            .store
            .update_member(&member.id, patch)
            .await
            .map_err(conflict_or_internal)?
            .ok_or_else(|| MemberError::NotFound("Member not found".to_string()))?;

        self.with_account(updated).await
    }

    async fn delete_member(&self, id: &str) -> Result<(), MemberError> {
        if !self.store.delete_member(id).await? {
            return Err(MemberError::NotFound("Member not found".to_string()));
        }

        info!(member_id = %id, "Deleted member profile");
        Ok(())
    }
}
