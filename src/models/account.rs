use crate::entities::users::{self, Role};

use super::Member;

/// Account data returned from the store (without the password hash).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for Account {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            username: model.username,
            email: model.email,
            role: model.role,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// An account with its member profile, if it has one.
#[derive(Debug, Clone)]
pub struct AccountWithMember {
    pub account: Account,
    pub member: Option<Member>,
}

/// Credentials and identity for a new account. The password is plaintext
/// here and is hashed before it reaches the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: Role,
}

/// Partial update of an account. Empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl AccountPatch {
    /// Drops fields that are present but empty.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            username: non_empty(self.username),
            password: non_empty(self.password),
            name: non_empty(self.name),
            email: non_empty(self.email),
            role: self.role,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
