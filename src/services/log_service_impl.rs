//! `SeaORM` implementation of the `LogService` trait.

use std::fmt::Write as _;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::channel::mpsc;
use futures::{SinkExt, TryStreamExt};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::db::repositories::logs::LogRepository;
use crate::db::{Store, format_timestamp};
use crate::entities::api_logs;
use crate::models::api_log::{
    ApiLogEntry, LogFilter, LogPage, LogStats, NewApiLog, Pagination,
};
use crate::services::log_service::{
    CleanupReport, ExportFormat, ExportStream, LogError, LogService,
};

const EXPORT_CHUNK_BYTES: usize = 100 * 1024;
const TOP_N: u32 = 10;

const CSV_HEADER: &str = "ID,Method,Path,IP,User Agent,Status Code,Response Time,User ID,Username,Admin ID,Admin Name,Request Body,Error,Created At\n";

pub struct SeaOrmLogService {
    store: Store,
    vacuum_threshold: u64,
}

impl SeaOrmLogService {
    #[must_use]
    pub const fn new(store: Store, vacuum_threshold: u64) -> Self {
        Self {
            store,
            vacuum_threshold,
        }
    }
}

#[async_trait]
impl LogService for SeaOrmLogService {
    async fn record(&self, entry: NewApiLog) -> Result<(), LogError> {
        Ok(self.store.add_api_log(entry).await?)
    }

    async fn list(&self, filter: LogFilter, page: u64, limit: u64) -> Result<LogPage, LogError> {
        let (logs, total) = self.store.get_api_logs(&filter, page, limit).await?;

        Ok(LogPage {
            logs,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn stats(&self) -> Result<LogStats, LogError> {
        let repo = self.store.logs_repo();

        Ok(LogStats {
            overall: repo.overall_stats().await?,
            by_method: repo.method_counts().await?,
            top_paths: repo.top_paths(TOP_N).await?,
            top_ips: repo.top_ips(TOP_N).await?,
        })
    }

    async fn detail(&self, id: i32) -> Result<ApiLogEntry, LogError> {
        self.store
            .get_api_log(id)
            .await?
            .ok_or(LogError::NotFound(id))
    }

    async fn export(&self, limit: u64, format: ExportFormat) -> Result<ExportStream, LogError> {
        let conn = self.store.conn.clone();
        let (mut tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            if let Err(e) = stream_export(&conn, limit, format, &mut tx).await {
                error!(error = %e, "Log export failed");
                let _ = tx.send(Err(std::io::Error::other("export failed"))).await;
            }
        });

        Ok(rx)
    }

    async fn cleanup(&self, retain_days: u32) -> Result<CleanupReport, LogError> {
        let cutoff_date = format_timestamp(Utc::now() - Duration::days(i64::from(retain_days)));
        let cutoff = cutoff_date.clone();

        let deleted_count = self
            .store
            .transaction(move |txn| {
                Box::pin(async move {
                    Ok::<_, LogError>(LogRepository::delete_older_than(txn, &cutoff).await?)
                })
            })
            .await?;

        info!(
            deleted = deleted_count,
            cutoff = %cutoff_date,
            "Old API logs removed"
        );

        if deleted_count > self.vacuum_threshold {
            if let Err(e) = self.store.logs_repo().vacuum().await {
                warn!(error = %e, "VACUUM after log cleanup failed");
            } else {
                info!("Database vacuumed after log cleanup");
            }
        }

        Ok(CleanupReport {
            deleted_count,
            cutoff_date,
        })
    }
}

type ChunkSender = mpsc::Sender<Result<String, std::io::Error>>;

async fn stream_export(
    conn: &DatabaseConnection,
    limit: u64,
    format: ExportFormat,
    tx: &mut ChunkSender,
) -> anyhow::Result<()> {
    let rows = LogRepository::export_query(limit)
        .stream(conn)
        .await
        .context("Failed to open export stream")?;
    futures::pin_mut!(rows);

    let mut buffer = String::with_capacity(EXPORT_CHUNK_BYTES + 4096);
    match format {
        ExportFormat::Csv => buffer.push_str(CSV_HEADER),
        ExportFormat::Json => buffer.push('['),
    }

    let mut first = true;
    while let Some(row) = rows.try_next().await? {
        match format {
            ExportFormat::Csv => write_csv_row(&mut buffer, &row),
            ExportFormat::Json => {
                if !first {
                    buffer.push(',');
                }
                buffer.push('\n');
                buffer.push_str(&serde_json::to_string(&ApiLogEntry::from(row))?);
            }
        }
        first = false;

        if buffer.len() >= EXPORT_CHUNK_BYTES {
            let chunk = std::mem::replace(
                &mut buffer,
                String::with_capacity(EXPORT_CHUNK_BYTES + 4096),
            );
            if tx.send(Ok(chunk)).await.is_err() {
                // Client hung up.
                return Ok(());
            }
        }
    }

    if format == ExportFormat::Json {
        buffer.push_str("\n]\n");
    }

    let _ = tx.send(Ok(buffer)).await;
    Ok(())
}

/// Quotes a text field, doubling embedded quotes.
fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_opt_text(value: Option<&str>) -> String {
    value.map(csv_quote).unwrap_or_default()
}

fn csv_opt_num(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_csv_row(buffer: &mut String, row: &api_logs::Model) {
    let _ = writeln!(
        buffer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        row.id,
        csv_quote(&row.method),
        csv_quote(&row.path),
        csv_quote(&row.ip),
        csv_opt_text(row.user_agent.as_deref()),
        row.status_code,
        row.response_time,
        csv_opt_num(row.user_id),
        csv_opt_text(row.username.as_deref()),
        csv_opt_num(row.admin_id),
        csv_opt_text(row.admin_name.as_deref()),
        csv_opt_text(row.request_body.as_deref()),
        csv_opt_text(row.error.as_deref()),
        csv_quote(&row.created_at),
    );
}
