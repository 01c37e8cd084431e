use serde::Serialize;

use crate::entities::api_logs;

/// One audited request, ready to be written.
#[derive(Debug, Clone, Default)]
pub struct NewApiLog {
    pub method: String,
    pub path: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub status_code: u16,
    pub response_time_ms: i64,
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub admin_id: Option<i32>,
    pub admin_name: Option<String>,
    pub request_body: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiLogEntry {
    pub id: i32,
    pub method: String,
    pub path: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub status_code: i32,
    pub response_time: i64,
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub admin_id: Option<i32>,
    pub admin_name: Option<String>,
    pub request_body: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
}

impl From<api_logs::Model> for ApiLogEntry {
    fn from(model: api_logs::Model) -> Self {
        Self {
            id: model.id,
            method: model.method,
            path: model.path,
            ip: model.ip,
            user_agent: model.user_agent,
            status_code: model.status_code,
            response_time: model.response_time,
            user_id: model.user_id,
            username: model.username,
            admin_id: model.admin_id,
            admin_name: model.admin_name,
            request_body: model.request_body,
            error: model.error,
            created_at: model.created_at,
        }
    }
}

/// List view of a log row; body and error are cut to a short preview.
#[derive(Debug, Clone, Serialize)]
pub struct ApiLogSummary {
    pub id: i32,
    pub method: String,
    pub path: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub status_code: i32,
    pub response_time: i64,
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub admin_id: Option<i32>,
    pub admin_name: Option<String>,
    pub request_body_preview: Option<String>,
    pub error_preview: Option<String>,
    pub created_at: String,
}

pub const PREVIEW_CHARS: usize = 500;

impl From<api_logs::Model> for ApiLogSummary {
    fn from(model: api_logs::Model) -> Self {
        Self {
            id: model.id,
            method: model.method,
            path: model.path,
            ip: model.ip,
            user_agent: model.user_agent,
            status_code: model.status_code,
            response_time: model.response_time,
            user_id: model.user_id,
            username: model.username,
            admin_id: model.admin_id,
            admin_name: model.admin_name,
            request_body_preview: model
                .request_body
                .map(|b| truncate_chars(&b, PREVIEW_CHARS)),
            error_preview: model.error.map(|e| truncate_chars(&e, PREVIEW_CHARS)),
            created_at: model.created_at,
        }
    }
}

/// Already validated listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub method: Option<String>,
    pub path: Option<String>,
    pub status_code: Option<i32>,
    pub user_id: Option<i32>,
    pub admin_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub logs: Vec<ApiLogSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total: i64,
    pub avg_response_time: f64,
    pub max_response_time: i64,
    pub min_response_time: i64,
    pub error_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodCount {
    pub method: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStats {
    pub path: String,
    pub count: i64,
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub overall: OverallStats,
    pub by_method: Vec<MethodCount>,
    pub top_paths: Vec<PathStats>,
    #[serde(rename = "topIPs")]
    pub top_ips: Vec<IpCount>,
}

/// Cuts `value` to at most `max` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
