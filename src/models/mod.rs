pub mod account;
pub mod member;

pub use crate::entities::users::Role;
pub use account::{Account, AccountPatch, AccountWithMember, NewAccount};
pub use member::{Member, MemberPatch, MemberWithAccount, NewMember};
