use crate::entities::members;

use super::Account;

/// Member profile attached to exactly one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
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

impl From<members::Model> for Member {
    fn from(model: members::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            registration_number: model.registration_number,
            department: model.department,
            address: model.address,
            city: model.city,
            country: model.country,
            phone: model.phone,
            avatar_url: model.avatar_url,
            bio: model.bio,
            is_profile_complete: model.is_profile_complete,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A member profile joined with its owning account.
#[derive(Debug, Clone)]
pub struct MemberWithAccount {
    pub member: Member,
    pub account: Account,
}

/// Profile fields supplied when a member record is created.
#[derive(Debug, Clone, Default)]
pub struct NewMember {
    pub registration_number: String,
    pub department: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub is_profile_complete: bool,
}

impl NewMember {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("registration_number", &self.registration_number),
            ("department", &self.department),
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Partial update of a member profile. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct MemberPatch {
    pub registration_number: Option<String>,
    pub department: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required() {
        let member = NewMember {
            registration_number: "R-1".to_string(),
            department: "  ".to_string(),
            address: "1 Main St".to_string(),
            city: String::new(),
            country: "NL".to_string(),
            ..Default::default()
        };

        assert_eq!(member.missing_required(), vec!["department", "city"]);
    }
}
