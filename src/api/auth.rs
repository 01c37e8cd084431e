use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, CurrentAdmin, CurrentUser};
use super::validation::{MAX_PASSWORD_CHARS, is_valid_email, is_valid_username, validate_password};
use super::{ApiError, AppState};
use crate::services::{AdminSession, UserIdentity, UserSession};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct UserSessionResponse {
    pub message: &'static str,
    pub user: UserSession,
}

#[derive(Serialize)]
pub struct AdminSessionResponse {
    pub message: &'static str,
    pub admin: AdminSession,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub user: UserIdentity,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Presence and length checks shared by both login endpoints. Over-long
/// passwords are refused before any hashing work.
fn login_credentials(payload: LoginRequest) -> Result<(String, String), ApiError> {
    let (Some(username), Some(password)) = (non_empty(payload.username), non_empty(payload.password))
    else {
        return Err(ApiError::validation("用户名和密码不能为空"));
    };

    if password.chars().count() > MAX_PASSWORD_CHARS {
        return Err(ApiError::validation("密码过长"));
    }

    Ok((username, password))
}

// ============================================================================
// User Handlers
// ============================================================================

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserSessionResponse>), ApiError> {
    let (Some(username), Some(password), Some(email)) = (
        non_empty(payload.username),
        non_empty(payload.password),
        non_empty(payload.email),
    ) else {
        return Err(ApiError::validation("用户名、密码和邮箱不能为空"));
    };

    validate_password(&password)?;

    if !is_valid_username(&username) {
        return Err(ApiError::validation(
            "用户名只能包含字母、数字、下划线和中文，长度2-20位",
        ));
    }

    if !is_valid_email(&email) {
        return Err(ApiError::validation("邮箱格式不正确"));
    }

    let user = state
        .shared
        .auth_service
        .register(&username, &email, &password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserSessionResponse {
            message: "注册成功",
            user,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<UserSessionResponse>, ApiError> {
    let (username, password) = login_credentials(payload)?;

    let user = state.shared.auth_service.login(&username, &password).await?;

    Ok(Json(UserSessionResponse {
        message: "登录成功",
        user,
    }))
}

/// GET /api/auth/verify
pub async fn verify(CurrentUser(user): CurrentUser) -> Json<VerifyResponse> {
    Json(VerifyResponse { user })
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.shared.auth_service.logout(user.id).await?;

    Ok(Json(MessageResponse {
        message: "登出成功",
    }))
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// POST /api/admin/login
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AdminSessionResponse>, ApiError> {
    let (username, password) = login_credentials(payload)?;

    let admin = state
        .shared
        .auth_service
        .admin_login(&username, &password)
        .await?;

    Ok(Json(AdminSessionResponse {
        message: "登录成功",
        admin,
    }))
}

/// POST /api/admin/logout
pub async fn admin_logout(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(admin): CurrentAdmin,
) -> Result<Json<MessageResponse>, ApiError> {
    state.shared.auth_service.admin_logout(admin.id).await?;

    Ok(Json(MessageResponse {
        message: "登出成功",
    }))
}
