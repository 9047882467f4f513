pub mod member;
pub mod user;
