pub mod prelude;

pub mod members;
pub mod users;
