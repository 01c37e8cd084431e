use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::extract::{ApiJson, CurrentAdmin};
use super::validation::{MAX_CATEGORY_DESCRIPTION_CHARS, MAX_CATEGORY_NAME_CHARS};
use super::{ApiError, AppState};
use crate::models::catalog::Category;
use crate::services::CategoryFields;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TryFrom<CategoryRequest> for CategoryFields {
    type Error = ApiError;

    fn try_from(req: CategoryRequest) -> Result<Self, Self::Error> {
        let name = req.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(ApiError::validation("分类名称不能为空"));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_CHARS {
            return Err(ApiError::validation("分类名称不能超过50个字符"));
        }

        let description = req.description.unwrap_or_default();
        if description.chars().count() > MAX_CATEGORY_DESCRIPTION_CHARS {
            return Err(ApiError::validation("分类描述不能超过200个字符"));
        }

        Ok(Self {
            name: name.to_string(),
            icon: req.icon.unwrap_or_default(),
            description,
        })
    }
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.shared.catalog_service.list_categories().await?))
}

/// GET /api/categories/{id}
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.shared.catalog_service.get_category(id).await?))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    ApiJson(payload): ApiJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let fields = CategoryFields::try_from(payload)?;
    let category = state.shared.catalog_service.create_category(fields).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/{id}
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let fields = CategoryFields::try_from(payload)?;

    Ok(Json(
        state.shared.catalog_service.update_category(id, fields).await?,
    ))
}

/// DELETE /api/categories/{id}
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(id): Path<i32>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.shared.catalog_service.delete_category(id).await?))
}
