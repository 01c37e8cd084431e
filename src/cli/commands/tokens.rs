//! Expired token sweep command handler

use crate::config::Config;
use crate::db::Store;
use crate::services::TokenStore;

pub async fn cmd_sweep_tokens(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let tokens = TokenStore::new(store, &config.security);

    let report = tokens.sweep_expired().await?;

    println!(
        "Cleared {} expired user token(s) and {} expired admin token(s).",
        report.users, report.admins
    );

    Ok(())
}
