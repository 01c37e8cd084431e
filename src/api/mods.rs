use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, CurrentAdmin, CurrentUser};
use super::validation::{MAX_TEXT_CHARS, is_bounded_text, is_http_url, validate_optional_url};
use super::{ApiError, AppState};
use crate::models::catalog::{Mod, ModFields, ModSort, Rating};
use crate::services::{RatedStatus, RatingError};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ModListQuery {
    pub category: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub rating: Option<f64>,
    pub downloads: Option<i64>,
    pub icon: Option<String>,
    pub cloud_link: Option<String>,
    pub source_link: Option<String>,
    pub background_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub downloads: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedRating {
    pub id: i32,
    pub mod_id: i32,
    pub user_id: i32,
    pub rating: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResponse {
    pub success: bool,
    pub rating: SubmittedRating,
    pub average_rating: f64,
}

/// Whether the request replaces an existing mod; replacements must carry
/// every field except the optional links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Replace,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_mod_request(req: ModRequest, mode: Mode) -> Result<ModFields, ApiError> {
    let (Some(name), Some(description), Some(category)) = (
        required(req.name),
        required(req.description),
        required(req.category),
    ) else {
        return Err(ApiError::validation("名称、描述和分类不能为空"));
    };

    if !is_bounded_text(&name, MAX_TEXT_CHARS) || !is_bounded_text(&description, MAX_TEXT_CHARS) {
        return Err(ApiError::validation("名称和描述不能超过1000个字符"));
    }

    if mode == Mode::Replace && (req.icon.is_none() || req.cloud_link.is_none() || req.tags.is_none())
    {
        return Err(ApiError::validation("更新模组时必须提供全部字段"));
    }

    let cloud_link = req.cloud_link.map(|v| v.trim().to_string()).unwrap_or_default();
    if !cloud_link.is_empty() && !is_http_url(&cloud_link) {
        return Err(ApiError::validation("网盘链接格式不正确"));
    }

    let source_link = validate_optional_url(req.source_link, "源码链接格式不正确")?;
    let background_image = validate_optional_url(req.background_image, "背景图片链接格式不正确")?;

    if let Some(rating) = req.rating
        && !(0.0..=5.0).contains(&rating)
    {
        return Err(ApiError::validation("评分必须在0-5之间"));
    }

    if req.downloads.is_some_and(|d| d < 0) {
        return Err(ApiError::validation("下载量不能为负数"));
    }

    let icon = req.icon.unwrap_or_default();
    if icon.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::validation("图标不能超过1000个字符"));
    }

    let tags = req
        .tags
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(ModFields {
        name,
        description,
        category,
        tags,
        rating: req.rating,
        downloads: req.downloads,
        icon,
        cloud_link,
        source_link,
        background_image,
    })
}

// ============================================================================
// Catalog Handlers
// ============================================================================

/// GET /api/mods?category=&sortBy=
pub async fn list_mods(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModListQuery>,
) -> Result<Json<Vec<Mod>>, ApiError> {
    let sort = match query.sort_by.as_deref() {
        None | Some("") => ModSort::Default,
        Some(raw) => raw
            .parse::<ModSort>()
            .map_err(|()| ApiError::validation("无效的排序方式"))?,
    };

    let category = query.category.as_deref().filter(|c| !c.is_empty());

    Ok(Json(
        state.shared.catalog_service.list_mods(category, sort).await?,
    ))
}

/// GET /api/mods/{id}
pub async fn get_mod(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Mod>, ApiError> {
    Ok(Json(state.shared.catalog_service.get_mod(id).await?))
}

/// POST /api/mods/{id}/download
pub async fn record_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let downloads = state.shared.catalog_service.record_download(id).await?;

    Ok(Json(DownloadResponse {
        success: true,
        downloads,
    }))
}

/// POST /api/mods
pub async fn create_mod(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    ApiJson(payload): ApiJson<ModRequest>,
) -> Result<(StatusCode, Json<Mod>), ApiError> {
    let fields = validate_mod_request(payload, Mode::Create)?;
    let created = state.shared.catalog_service.create_mod(fields).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/mods/{id}
pub async fn update_mod(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<ModRequest>,
) -> Result<Json<Mod>, ApiError> {
    let fields = validate_mod_request(payload, Mode::Replace)?;

    Ok(Json(state.shared.catalog_service.update_mod(id, fields).await?))
}

/// DELETE /api/mods/{id}
pub async fn delete_mod(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(id): Path<i32>,
) -> Result<Json<Mod>, ApiError> {
    Ok(Json(state.shared.catalog_service.delete_mod(id).await?))
}

// ============================================================================
// Rating Handlers
// ============================================================================

/// GET /api/mods/{id}/ratings
pub async fn list_ratings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<Rating>>, ApiError> {
    Ok(Json(state.shared.rating_service.ratings(id).await?))
}

/// GET /api/mods/{id}/rated
pub async fn has_rated(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<RatedStatus>, ApiError> {
    Ok(Json(state.shared.rating_service.has_rated(id, user.id).await?))
}

/// POST /api/mods/{id}/rate
pub async fn rate_mod(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<RateRequest>,
) -> Result<Json<RateResponse>, ApiError> {
    let value = payload
        .rating
        .as_ref()
        .and_then(parse_star_rating)
        .ok_or(RatingError::OutOfRange)?;

    let outcome = state.shared.rating_service.rate(id, &user, value).await?;

    Ok(Json(RateResponse {
        success: true,
        rating: SubmittedRating {
            id: outcome.rating.id,
            mod_id: outcome.rating.mod_id,
            user_id: outcome.rating.user_id,
            rating: outcome.rating.rating,
        },
        average_rating: outcome.average,
    }))
}

/// Accepts whole numbers 1 to 5, including integral floats such as `4.0`.
#[allow(clippy::cast_possible_truncation)]
fn parse_star_rating(raw: &serde_json::Value) -> Option<i32> {
    let value = match raw.as_i64() {
        Some(v) => v,
        None => {
            let f = raw.as_f64()?;
            if f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };

    (1..=5).contains(&value).then_some(value as i32)
}
