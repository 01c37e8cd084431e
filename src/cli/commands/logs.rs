//! Audit log retention command handler

use crate::config::Config;
use crate::db::Store;
use crate::services::{LogService, SeaOrmLogService};

pub async fn cmd_cleanup_logs(config: &Config, days: u32) -> anyhow::Result<()> {
    if !(1..=365).contains(&days) {
        anyhow::bail!("--days must be between 1 and 365 (got {days})");
    }

    let store = Store::new(&config.general.database_path).await?;
    let logs = SeaOrmLogService::new(store, config.logs.vacuum_threshold);

    let report = logs.cleanup(days).await?;

    println!(
        "Deleted {} log entries older than {}.",
        report.deleted_count, report.cutoff_date
    );

    Ok(())
}
