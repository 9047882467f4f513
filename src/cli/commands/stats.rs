//! Stats command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_stats(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let counts = store.counts().await?;

    println!("Roster ({})", config.general.database_path);
    println!("{:-<40}", "");
    println!("Users:   {}", counts.users);
    println!("Admins:  {}", counts.admins);
    println!("Members: {}", counts.members);

    Ok(())
}
