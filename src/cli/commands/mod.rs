mod admin;
mod stats;

pub use admin::cmd_create_admin;
pub use stats::cmd_stats;
