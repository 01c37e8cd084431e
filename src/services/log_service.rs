//! Audit log recording, querying, export and retention.

use futures::channel::mpsc;
use serde::Deserialize;
use thiserror::Error;

use crate::models::api_log::{ApiLogEntry, LogFilter, LogPage, LogStats, NewApiLog};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Log entry not found: {0}")]
    NotFound(i32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for LogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Chunks of an export, produced by a background task.
pub type ExportStream = mpsc::Receiver<Result<String, std::io::Error>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted_count: u64,
    pub cutoff_date: String,
}

#[async_trait::async_trait]
pub trait LogService: Send + Sync {
    /// Appends one audit row.
    async fn record(&self, entry: NewApiLog) -> Result<(), LogError>;

    /// `page` is 1-based; rows come newest first.
    async fn list(&self, filter: LogFilter, page: u64, limit: u64) -> Result<LogPage, LogError>;

    async fn stats(&self) -> Result<LogStats, LogError>;

    async fn detail(&self, id: i32) -> Result<ApiLogEntry, LogError>;

    /// Streams the newest `limit` rows in the requested format.
    async fn export(&self, limit: u64, format: ExportFormat) -> Result<ExportStream, LogError>;

    /// Deletes rows older than `retain_days` days and reclaims space after large deletes.
    async fn cleanup(&self, retain_days: u32) -> Result<CleanupReport, LogError>;
}
