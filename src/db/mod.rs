use anyhow::{Context, Result};
use sea_orm::sqlx::sqlite::SqliteJournalMode;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::models::{
    Account, AccountPatch, Member, MemberPatch, NewAccount, NewMember, Role,
};

pub mod migrator;
pub mod repositories;

/// Row counts reported at start-up and by `roster stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub users: u64,
    pub members: u64,
    pub admins: u64,
}

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)
                    .with_context(|| format!("Failed to create database file {path_str}"))?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false)
            .map_sqlx_sqlite_opts(move |opts| {
                // Concurrent writers wait on the lock instead of failing fast.
                let opts = opts.busy_timeout(SQLITE_BUSY_TIMEOUT);
                if in_memory {
                    opts
                } else {
                    opts.journal_mode(SqliteJournalMode::Wal)
                }
            });

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn member_repo(&self) -> repositories::member::MemberRepository {
        repositories::member::MemberRepository::new(self.conn.clone())
    }

    // Accounts

    pub async fn get_user(&self, id: &str) -> Result<Option<Account>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>> {
        self.user_repo()
            .get_by_username_with_password(username)
            .await
    }

    pub async fn username_in_use(&self, username: &str, except_id: Option<&str>) -> Result<bool> {
        self.user_repo().username_in_use(username, except_id).await
    }

    pub async fn email_in_use(&self, email: &str, except_id: Option<&str>) -> Result<bool> {
        self.user_repo().email_in_use(email, except_id).await
    }

    pub async fn create_user_with_member(
        &self,
        account: NewAccount,
        password_hash: String,
        member: NewMember,
    ) -> Result<(Account, Member)> {
        self.user_repo()
            .create_with_member(account, password_hash, member)
            .await
    }

    pub async fn update_user(
        &self,
        id: &str,
        patch: AccountPatch,
        password_hash: Option<String>,
    ) -> Result<Option<Account>> {
        self.user_repo().update(id, patch, password_hash).await
    }

    pub async fn list_users_with_members(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<(Account, Option<Member>)>> {
        self.user_repo().list_with_members(offset, limit).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<bool> {
        self.user_repo().delete_with_member(id).await
    }

    // Members

    pub async fn get_member(&self, id: &str) -> Result<Option<Member>> {
        self.member_repo().get(id).await
    }

    pub async fn get_member_by_user(&self, user_id: &str) -> Result<Option<Member>> {
        self.member_repo().get_by_user(user_id).await
    }

    pub async fn list_members_with_users(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<(Member, Option<Account>)>> {
        self.member_repo().list_with_accounts(offset, limit).await
    }

    pub async fn registration_number_in_use(
        &self,
        number: &str,
        except_id: Option<&str>,
    ) -> Result<bool> {
        self.member_repo()
            .registration_number_in_use(number, except_id)
            .await
    }

    pub async fn create_member(&self, user_id: &str, member: NewMember) -> Result<Member> {
        self.member_repo().create(user_id, member).await
    }

    pub async fn update_member(&self, id: &str, patch: MemberPatch) -> Result<Option<Member>> {
        self.member_repo().update(id, patch).await
    }

    pub async fn set_member_avatar(&self, id: &str, avatar_url: &str) -> Result<Option<Member>> {
        self.member_repo().set_avatar(id, avatar_url).await
    }

    pub async fn delete_member(&self, id: &str) -> Result<bool> {
        self.member_repo().delete(id).await
    }

    pub async fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            users: self.user_repo().count().await?,
            members: self.member_repo().count().await?,
            admins: self.user_repo().count_with_role(Role::Admin).await?,
        })
    }
}

/// Message of the unique-constraint violation in the error chain, if the
/// failure was one (e.g. `UNIQUE constraint failed: users.email`).
#[must_use]
pub fn unique_violation(err: &anyhow::Error) -> Option<String> {
    err.chain().find_map(|cause| {
        match cause.downcast_ref::<DbErr>().and_then(DbErr::sql_err) {
            Some(SqlErr::UniqueConstraintViolation(message)) => Some(message),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("roster-store-{}-{name}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_file_store_uses_wal_and_creates_parent_dir() {
        let dir = temp_path("nested");
        let db_path = dir.join("data").join("roster.db");

        let store = Store::new(&format!("sqlite:{}", db_path.display()))
            .await
            .unwrap();
        assert!(db_path.exists());

        let backend = store.conn.get_database_backend();
        let row = store
            .conn
            .query_one(Statement::from_string(
                backend,
                "PRAGMA journal_mode".to_string(),
            ))
            .await
            .unwrap()
            .unwrap();
        let mode: String = row.try_get("", "journal_mode").unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        drop(store);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_unusable_parent_dir_is_reported() {
        let blocker = temp_path("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let db_path = blocker.join("roster.db");

        let err = Store::new(&format!("sqlite:{}", db_path.display()))
            .await
            .err()
            .expect("opening under a file must fail");
        assert!(err.to_string().contains("Failed to create database directory"));

        std::fs::remove_file(&blocker).ok();
    }
}
