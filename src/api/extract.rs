//! Request extractors: JSON bodies with API-shaped rejections, and the
//! principal resolved by the audit middleware.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::{HeaderMap, header, request::Parts},
};
use serde::de::DeserializeOwned;

use super::ApiError;
use crate::services::{AdminIdentity, Principal, UserIdentity};

/// `Json<T>` whose rejection is a 400 with a JSON error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => {
                Err(ApiError::validation("请求体必须是JSON格式"))
            }
            Err(JsonRejection::JsonDataError(e)) => {
                Err(ApiError::validation(format!("请求参数无效: {}", e.body_text())))
            }
            Err(_) => Err(ApiError::validation("请求体格式无效")),
        }
    }
}

/// Reads the token from `Authorization`. The raw value is the token; a
/// `Bearer ` prefix is tolerated.
#[must_use]
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

    (!token.is_empty()).then(|| token.to_string())
}

fn principal_of(parts: &Parts) -> Principal {
    parts.extensions.get::<Principal>().cloned().unwrap_or_default()
}

fn rejection(parts: &Parts) -> ApiError {
    if extract_token(&parts.headers).is_some() {
        ApiError::unauthorized("无效的认证令牌")
    } else {
        ApiError::unauthorized("未提供认证令牌")
    }
}

/// A signed-in regular user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserIdentity);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match principal_of(parts) {
            Principal::User(user) => Ok(Self(user)),
            _ => Err(rejection(parts)),
        }
    }
}

/// A signed-in administrator.
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub AdminIdentity);

impl<S: Send + Sync> FromRequestParts<S> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match principal_of(parts) {
            Principal::Admin(admin) => Ok(Self(admin)),
            _ => Err(rejection(parts)),
        }
    }
}
