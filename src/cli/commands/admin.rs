//! Create-admin command handler

use crate::api::create_app_state_from_config;
use crate::cli::CreateAdminArgs;
use crate::config::Config;
use crate::services::AuthError;

pub async fn cmd_create_admin(config: &Config, args: CreateAdminArgs) -> anyhow::Result<()> {
    let state = create_app_state_from_config(config.clone(), None).await?;

    match state.auth_service().register(args.into()).await {
        Ok(created) => {
            println!("✓ Admin account created");
            println!("  ID:       {}", created.account.id);
            println!("  Username: {}", created.account.username);
            println!("  Email:    {}", created.account.email);
            Ok(())
        }
        Err(AuthError::Conflict(reason)) => {
            println!("Admin account not created: {reason}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
