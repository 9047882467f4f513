use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{members, users};
use crate::models::{Account, Member, MemberPatch, NewMember};

pub struct MemberRepository {
    conn: DatabaseConnection,
}

impl MemberRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Member>> {
        let member = members::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query member by ID")?;

        Ok(member.map(Member::from))
    }

    pub async fn get_by_user(&self, user_id: &str) -> Result<Option<Member>> {
        let member = members::Entity::find()
            .filter(members::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query member by user ID")?;

        Ok(member.map(Member::from))
    }

    /// Member profiles joined with their owning account, paginated.
    /// The account is `None` only if the data is inconsistent.
    pub async fn list_with_accounts(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<(Member, Option<Account>)>> {
        let rows = members::Entity::find()
            .find_also_related(users::Entity)
            .order_by_asc(members::Column::CreatedAt)
            .order_by_asc(members::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list members")?;

        Ok(rows
            .into_iter()
            .map(|(member, user)| (Member::from(member), user.map(Account::from)))
            .collect())
    }

    /// Whether `number` belongs to a member other than `except_id`.
    pub async fn registration_number_in_use(
        &self,
        number: &str,
        except_id: Option<&str>,
    ) -> Result<bool> {
        let mut query =
            members::Entity::find().filter(members::Column::RegistrationNumber.eq(number));
        if let Some(id) = except_id {
            query = query.filter(members::Column::Id.ne(id));
        }

        let count = query
            .count(&self.conn)
            .await
            .context("Failed to check registration number uniqueness")?;
        Ok(count > 0)
    }

    pub async fn create(&self, user_id: &str, member: NewMember) -> Result<Member> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = members::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
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
        .insert(&self.conn)
        .await
        .context("Failed to insert member profile")?;

        Ok(Member::from(model))
    }

    /// Apply the present fields of `patch` and mark the profile complete.
    pub async fn update(&self, id: &str, patch: MemberPatch) -> Result<Option<Member>> {
        let Some(member) = members::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query member for update")?
        else {
            return Ok(None);
        };

        let mut active: members::ActiveModel = member.into();
        if let Some(v) = patch.registration_number {
            active.registration_number = Set(v);
        }
        if let Some(v) = patch.department {
            active.department = Set(v);
        }
        if let Some(v) = patch.address {
            active.address = Set(v);
        }
        if let Some(v) = patch.city {
            active.city = Set(v);
        }
        if let Some(v) = patch.country {
            active.country = Set(v);
        }
        if let Some(v) = patch.phone {
            active.phone = Set(Some(v));
        }
        if let Some(v) = patch.avatar_url {
            active.avatar_url = Set(Some(v));
        }
        if let Some(v) = patch.bio {
            active.bio = Set(Some(v));
        }
        // Flagged regardless of which fields were supplied; clients rely on it.
        active.is_profile_complete = Set(true);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update member profile")?;

        Ok(Some(Member::from(updated)))
    }

    /// Record a new avatar reference. Does not touch the completeness flag.
    pub async fn set_avatar(&self, id: &str, avatar_url: &str) -> Result<Option<Member>> {
        let Some(member) = members::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query member for avatar update")?
        else {
            return Ok(None);
        };

        let mut active: members::ActiveModel = member.into();
        active.avatar_url = Set(Some(avatar_url.to_string()));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update avatar")?;

        Ok(Some(Member::from(updated)))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = members::Entity::delete_by_id(id.to_string())
            .exec(&self.conn)
            .await
            .context("Failed to delete member profile")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(members::Entity::find().count(&self.conn).await?)
    }
}
