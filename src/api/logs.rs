use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::CurrentAdmin;
use super::validation::{sanitize_path_filter, validate_log_method, validate_positive_id};
use super::{ApiError, AppState};
use crate::models::api_log::{ApiLogEntry, LogFilter, LogPage, LogStats};
use crate::services::ExportFormat;

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;
const DEFAULT_EXPORT_LIMIT: u64 = 1000;
const MAX_EXPORT_LIMIT: u64 = 10_000;
const DEFAULT_RETAIN_DAYS: u32 = 30;

/// Query values arrive as raw strings so malformed numbers produce the same
/// field-specific message as out-of-range ones.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub status_code: Option<String>,
    pub user_id: Option<String>,
    pub admin_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub limit: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub message: String,
    pub deleted_count: u64,
    pub cutoff_date: String,
}

/// Blank values count as absent.
fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_in_range<T>(
    raw: Option<&String>,
    default: T,
    range: std::ops::RangeInclusive<T>,
    message: &str,
) -> Result<T, ApiError>
where
    T: std::str::FromStr + PartialOrd,
{
    let Some(raw) = present(raw) else {
        return Ok(default);
    };

    raw.parse::<T>()
        .ok()
        .filter(|v| range.contains(v))
        .ok_or_else(|| ApiError::validation(message))
}

fn parse_id(raw: Option<&String>, message: &str) -> Result<Option<i32>, ApiError> {
    present(raw)
        .map(|v| {
            let id = v.parse::<i32>().map_err(|_| ApiError::validation(message))?;
            validate_positive_id(id, message)
        })
        .transpose()
}

impl LogListQuery {
    fn into_parts(self) -> Result<(LogFilter, u64, u64), ApiError> {
        let page = parse_in_range(self.page.as_ref(), 1, 1..=u64::MAX, "分页参数无效")?;
        let limit = parse_in_range(
            self.limit.as_ref(),
            DEFAULT_PAGE_SIZE,
            1..=MAX_PAGE_SIZE,
            "分页参数无效",
        )?;

        // The page offset must fit the SQL OFFSET the pager computes.
        (page - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| ApiError::validation("分页参数无效"))?;

        let method = present(self.method.as_ref())
            .map(validate_log_method)
            .transpose()?;

        let path = match present(self.path.as_ref()) {
            Some(path) => sanitize_path_filter(path)?,
            None => None,
        };

        let status_code = present(self.status_code.as_ref())
            .map(|raw| {
                raw.parse::<i32>()
                    .ok()
                    .filter(|code| (100..=599).contains(code))
                    .ok_or_else(|| ApiError::validation("无效的状态码"))
            })
            .transpose()?;

        let filter = LogFilter {
            method,
            path,
            status_code,
            user_id: parse_id(self.user_id.as_ref(), "无效的用户ID")?,
            admin_id: parse_id(self.admin_id.as_ref(), "无效的管理员ID")?,
        };

        Ok((filter, page, limit))
    }
}

/// GET /api/logs
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<LogListQuery>,
) -> Result<Json<LogPage>, ApiError> {
    let (filter, page, limit) = query.into_parts()?;

    Ok(Json(state.shared.log_service.list(filter, page, limit).await?))
}

/// GET /api/logs/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
) -> Result<Json<LogStats>, ApiError> {
    Ok(Json(state.shared.log_service.stats().await?))
}

/// GET /api/logs/{id}
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiLogEntry>, ApiError> {
    let id = parse_id(Some(&raw_id), "无效的日志ID")?
        .ok_or_else(|| ApiError::validation("无效的日志ID"))?;

    Ok(Json(state.shared.log_service.detail(id).await?))
}

/// DELETE /api/logs/cleanup?days=
pub async fn cleanup_logs(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(admin): CurrentAdmin,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let days = parse_in_range(
        query.days.as_ref(),
        DEFAULT_RETAIN_DAYS,
        1..=365,
        "天数必须在1-365之间",
    )?;

    let report = state.shared.log_service.cleanup(days).await?;
    tracing::info!(
        admin_id = admin.id,
        days,
        deleted = report.deleted_count,
        "Admin cleaned up API logs"
    );

    Ok(Json(CleanupResponse {
        message: format!("成功清理{}条日志记录", report.deleted_count),
        deleted_count: report.deleted_count,
        cutoff_date: report.cutoff_date,
    }))
}

/// GET /api/logs/export?limit=&format=csv|json
pub async fn export_logs(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let limit = parse_in_range(
        query.limit.as_ref(),
        DEFAULT_EXPORT_LIMIT,
        1..=MAX_EXPORT_LIMIT,
        "导出数量必须在1-10000之间",
    )?;

    let format = match present(query.format.as_ref()) {
        None | Some("csv") => ExportFormat::Csv,
        Some("json") => ExportFormat::Json,
        Some(_) => return Err(ApiError::validation("导出格式必须是csv或json")),
    };

    let stream = state.shared.log_service.export(limit, format).await?;

    let filename = format!(
        "logs_{}.{}",
        chrono::Utc::now().format("%Y-%m-%d"),
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> LogListQuery {
        let mut q = LogListQuery::default();
        for (key, value) in pairs {
            let value = Some((*value).to_string());
            match *key {
                "page" => q.page = value,
                "limit" => q.limit = value,
                "method" => q.method = value,
                "path" => q.path = value,
                "statusCode" => q.status_code = value,
                "userId" => q.user_id = value,
                "adminId" => q.admin_id = value,
                _ => unreachable!(),
            }
        }
        q
    }

    #[test]
    fn test_defaults() {
        let (filter, page, limit) = query(&[]).into_parts().unwrap();
        assert_eq!(filter, LogFilter::default());
        assert_eq!((page, limit), (1, 50));
    }

    #[test]
    fn test_full_filter() {
        let (filter, page, limit) = query(&[
            ("page", "3"),
            ("limit", "200"),
            ("method", "get"),
            ("path", "/api/mods"),
            ("statusCode", "404"),
            ("userId", "7"),
            ("adminId", "1"),
        ])
        .into_parts()
        .unwrap();

        assert_eq!((page, limit), (3, 200));
        assert_eq!(filter.method.as_deref(), Some("GET"));
        assert_eq!(filter.path.as_deref(), Some("/api/mods"));
        assert_eq!(filter.status_code, Some(404));
        assert_eq!(filter.user_id, Some(7));
        assert_eq!(filter.admin_id, Some(1));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(query(&[("limit", "201")]).into_parts().is_err());
        assert!(query(&[("page", "0")]).into_parts().is_err());
        assert!(query(&[("page", "abc")]).into_parts().is_err());
        assert!(query(&[("method", "TRACE")]).into_parts().is_err());
        assert!(query(&[("statusCode", "600")]).into_parts().is_err());
        assert!(query(&[("userId", "0")]).into_parts().is_err());
        assert!(query(&[("adminId", "-4")]).into_parts().is_err());
    }

    #[test]
    fn test_rejects_overflowing_offset() {
        let max = u64::MAX.to_string();
        assert!(query(&[("page", &max), ("limit", "200")]).into_parts().is_err());
        assert!(query(&[("page", &max), ("limit", "1")]).into_parts().is_err());

        let (_, page, _) = query(&[("page", "1000000"), ("limit", "200")])
            .into_parts()
            .unwrap();
        assert_eq!(page, 1_000_000);
    }
}
