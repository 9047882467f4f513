pub use super::members::Entity as Members;
pub use super::users::Entity as Users;
