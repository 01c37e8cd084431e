//! Domain service for authentication of users and administrators.
//!
//! Handles registration, login/logout for both principal kinds, and the
//! first-boot administrator account.

use serde::Serialize;
use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Admin not found: {0}")]
    AdminNotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A signed-in user with their freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct UserSession {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminSession {
    pub id: i32,
    pub username: String,
    pub token: String,
}

/// Domain service trait for authentication.
///
/// Inputs are expected to be shape-validated already; this layer owns the
/// uniqueness and credential checks.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a user and signs them in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] or [`AuthError::EmailTaken`] on duplicates.
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserSession, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, username: &str, password: &str) -> Result<UserSession, AuthError>;

    async fn logout(&self, user_id: i32) -> Result<(), AuthError>;

    async fn admin_login(&self, username: &str, password: &str)
    -> Result<AdminSession, AuthError>;

    async fn admin_logout(&self, admin_id: i32) -> Result<(), AuthError>;

    /// Creates the initial administrator when none exists.
    /// Returns the generated password when one had to be made up.
    async fn ensure_admin(&self) -> Result<Option<String>, AuthError>;

    /// Sets a new random password for an administrator and returns it.
    async fn reset_admin_password(&self, username: &str) -> Result<String, AuthError>;
}
