use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use std::time::Duration;

use crate::services::{AuthError, CatalogError, LogError, RatingError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    PayloadTooLarge,

    TooManyRequests { retry_after: Duration },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::PayloadTooLarge => write!(f, "Request body too large"),
            Self::TooManyRequests { retry_after } => {
                write!(f, "Too many requests, retry after {}s", retry_after.as_secs())
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "数据库操作失败".to_string())
            }
            Self::ValidationError(msg) | Self::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "服务器内部错误".to_string())
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "请求体过大".to_string()),
            Self::TooManyRequests { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "请求过于频繁，请稍后再试".to_string(),
            ),
        };

        let mut response = (status, Json(json!({ "error": error_message }))).into_response();

        if let Self::TooManyRequests { retry_after } = self {
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("用户名或密码错误".to_string()),
            AuthError::UsernameTaken => Self::Conflict("用户名已存在".to_string()),
            AuthError::EmailTaken => Self::Conflict("邮箱已被注册".to_string()),
            AuthError::AdminNotFound(name) => Self::NotFound(format!("管理员 {name} 不存在")),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ModNotFound(_) => Self::NotFound("模组未找到".to_string()),
            CatalogError::CategoryNotFound(_) => Self::NotFound("分类未找到".to_string()),
            CatalogError::UnknownCategory(_) => Self::validation("无效的分类"),
            CatalogError::CategoryNameTaken => Self::Conflict("分类名称已存在".to_string()),
            e @ CatalogError::CategoryInUse(_) => Self::Conflict(e.to_string()),
            CatalogError::Database(msg) => Self::DatabaseError(msg),
            CatalogError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<RatingError> for ApiError {
    fn from(err: RatingError) -> Self {
        match err {
            RatingError::ModNotFound(_) => Self::NotFound("模组未找到".to_string()),
            RatingError::AlreadyRated => Self::Conflict("您已经评价过这个模组了".to_string()),
            RatingError::OutOfRange => Self::validation("评分必须是1-5之间的整数"),
            RatingError::Database(msg) => Self::DatabaseError(msg),
            RatingError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::NotFound(_) => Self::NotFound("日志未找到".to_string()),
            LogError::Database(msg) => Self::DatabaseError(msg),
            LogError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}
