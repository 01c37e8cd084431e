//! Admin password reset command handler

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService, TokenStore};

pub async fn cmd_reset_admin_password(
    config: &Config,
    username: Option<&str>,
) -> anyhow::Result<()> {
    let username = username.unwrap_or(&config.security.initial_admin_username);

    let store = Store::new(&config.general.database_path).await?;
    let tokens = TokenStore::new(store.clone(), &config.security);
    let auth = SeaOrmAuthService::new(store, tokens, config.security.clone());

    let password = auth.reset_admin_password(username).await?;

    println!("Password for admin '{username}' has been reset.");
    println!("New password: {password}");
    println!("Existing admin sessions were signed out.");

    Ok(())
}
