//! CLI module - Command-line interface for Roster
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Args, Parser, Subcommand};

use crate::models::{NewAccount, NewMember, Role};
use crate::services::Registration;

/// Roster - membership registry API
#[derive(Parser)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server (default)
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Register an administrator account with its member profile
    CreateAdmin(CreateAdminArgs),

    /// Show account and member counts
    Stats,
}

#[derive(Args, Debug)]
pub struct CreateAdminArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub registration_number: String,

    #[arg(long)]
    pub department: String,

    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub country: String,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub bio: Option<String>,
}

impl From<CreateAdminArgs> for Registration {
    fn from(args: CreateAdminArgs) -> Self {
        Self {
            account: NewAccount {
                username: args.username,
                email: args.email,
                password: args.password,
                name: args.name,
                role: Role::Admin,
            },
            member: NewMember {
                registration_number: args.registration_number,
                department: args.department,
                address: args.address,
                city: args.city,
                country: args.country,
                phone: args.phone,
                avatar_url: None,
                bio: args.bio,
                is_profile_complete: true,
            },
        }
    }
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["roster"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_create_admin_args() {
        let cli = Cli::try_parse_from([
            "roster",
            "create-admin",
            "--username",
            "root",
            "--email",
            "root@example.com",
            "--password",
            "s3cret",
            "--registration-number",
            "ADM-1",
            "--department",
            "Board",
            "--address",
            "1 Main St",
            "--city",
            "Delft",
            "--country",
            "NL",
        ])
        .unwrap();

        let Some(Commands::CreateAdmin(args)) = cli.command else {
            panic!("expected create-admin");
        };
        let registration = Registration::from(args);
        assert_eq!(registration.account.role, Role::Admin);
        assert_eq!(registration.account.username, "root");
        assert!(registration.member.missing_required().is_empty());
        assert!(registration.member.phone.is_none());
    }

    #[test]
    fn test_create_admin_requires_profile_fields() {
        let result = Cli::try_parse_from([
            "roster",
            "create-admin",
            "--username",
            "root",
            "--email",
            "root@example.com",
            "--password",
            "s3cret",
        ]);
        assert!(result.is_err());
    }
}
