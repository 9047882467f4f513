use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::entities::{members, users};
use crate::models::{Account, AccountPatch, Member, NewAccount, NewMember, Role};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get account by ID
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Account>> {
        let user = users::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(Account::from))
    }

    /// Get account by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(Account::from))
    }

    /// Get account by username together with its password hash (login only)
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (Account::from(u), password_hash)
        }))
    }

    /// Whether `username` belongs to an account other than `except_id`.
    pub async fn username_in_use(&self, username: &str, except_id: Option<&str>) -> Result<bool> {
        let mut query = users::Entity::find().filter(users::Column::Username.eq(username));
        if let Some(id) = except_id {
            query = query.filter(users::Column::Id.ne(id));
        }

        let count = query
            .count(&self.conn)
            .await
            .context("Failed to check username uniqueness")?;
        Ok(count > 0)
    }

    /// Whether `email` belongs to an account other than `except_id`.
    pub async fn email_in_use(&self, email: &str, except_id: Option<&str>) -> Result<bool> {
        let mut query = users::Entity::find().filter(users::Column::Email.eq(email));
        if let Some(id) = except_id {
            query = query.filter(users::Column::Id.ne(id));
        }

        let count = query
            .count(&self.conn)
            .await
            .context("Failed to check email uniqueness")?;
        Ok(count > 0)
    }

    /// Insert an account and its member profile in one transaction.
    pub async fn create_with_member(
        &self,
        account: NewAccount,
        password_hash: String,
        member: NewMember,
    ) -> Result<(Account, Member)> {
        let now = chrono::Utc::now().to_rfc3339();
        let user_id = Uuid::new_v4().to_string();

        let txn = self.conn.begin().await?;

        let user = users::ActiveModel {
            id: Set(user_id.clone()),
            name: Set(account.name),
            username: Set(account.username),
            email: Set(account.email),
            password_hash: Set(password_hash),
            role: Set(account.role),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
        }
        .insert(&txn)
        .await
        .context("Failed to insert user")?;

        let member = members::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id),
            registration_number: Set(member.registration_number),
            department: Set(member.department),
            address: Set(member.address),
            city: Set(member.city),
            country: Set(member.country),
            phone: Set(member.phone),
            avatar_url: Set(member.avatar_url),
            bio: Set(member.bio),
            is_profile_complete: Set(member.is_profile_complete),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .context("Failed to insert member profile")?;

        txn.commit().await?;

        info!("Created account {} ({})", user.username, user.id);
        Ok((Account::from(user), Member::from(member)))
    }

    /// Apply a patch. The plaintext password in `patch` is ignored; callers
    /// pass the already computed hash instead.
    pub async fn update(
        &self,
        id: &str,
        patch: AccountPatch,
        password_hash: Option<String>,
    ) -> Result<Option<Account>> {
        let Some(user) = users::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(username) = patch.username {
            active.username = Set(username);
        }
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(name) = patch.name {
            active.name = Set(Some(name));
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(role) = patch.role {
            active.role = Set(role);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        Ok(Some(Account::from(updated)))
    }

    /// Accounts joined with their (optional) member profile, paginated.
    pub async fn list_with_members(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<(Account, Option<Member>)>> {
        let rows = users::Entity::find()
            .find_also_related(members::Entity)
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows
            .into_iter()
            .map(|(user, member)| (Account::from(user), member.map(Member::from)))
            .collect())
    }

    /// Remove the member profile (if any) and then the account, atomically.
    pub async fn delete_with_member(&self, id: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        members::Entity::delete_many()
            .filter(members::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete member profile")?;

        let result = users::Entity::delete_by_id(id.to_string())
            .exec(&txn)
            .await
            .context("Failed to delete user")?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        txn.commit().await?;

        info!("Deleted account {}", id);
        Ok(true)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(users::Entity::find().count(&self.conn).await?)
    }

    pub async fn count_with_role(&self, role: Role) -> Result<u64> {
        Ok(users::Entity::find()
            .filter(users::Column::Role.eq(role))
            .count(&self.conn)
            .await?)
    }
}
