//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::SecurityConfig;
use crate::db::{Store, is_unique_violation};
use crate::services::auth_service::{AdminSession, AuthError, AuthService, UserSession};
use crate::services::password::{
    generate_password, hash_password_blocking, verify_password_blocking,
};
use crate::services::token_store::{PrincipalKind, TokenStore};
use async_trait::async_trait;
use tracing::{info, warn};

const GENERATED_PASSWORD_LEN: usize = 16;

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenStore,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, tokens: TokenStore, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(hash_password_blocking(password.to_string(), self.security.clone()).await?)
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserSession, AuthError> {
        if self.store.username_exists(username).await? {
            return Err(AuthError::UsernameTaken);
        }

        if self.store.email_exists(email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash(password).await?;

        // A concurrent registration can still win the race; the unique index decides.
        let user = match self.store.create_user(username, email, password_hash).await {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(if self.store.username_exists(username).await? {
                    AuthError::UsernameTaken
                } else {
                    AuthError::EmailTaken
                });
            }
            Err(e) => return Err(e.into()),
        };

        let token = self
            .tokens
            .issue(
                PrincipalKind::User,
                user.id,
                self.tokens.ttl(PrincipalKind::User),
            )
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");

        Ok(UserSession {
            id: user.id,
            username: user.username,
            email: user.email,
            token,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<UserSession, AuthError> {
        let Some((user, password_hash)) = self.store.get_user_with_password(username).await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password.to_string(), password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(
                PrincipalKind::User,
                user.id,
                self.tokens.ttl(PrincipalKind::User),
            )
            .await?;

        Ok(UserSession {
            id: user.id,
            username: user.username,
            email: user.email,
            token,
        })
    }

    async fn logout(&self, user_id: i32) -> Result<(), AuthError> {
        self.tokens.revoke(PrincipalKind::User, user_id).await?;
        Ok(())
    }

    async fn admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminSession, AuthError> {
        let Some((admin, password_hash)) = self.store.get_admin_with_password(username).await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password.to_string(), password_hash).await? {
            warn!(username = %username, "Failed admin login");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(
                PrincipalKind::Admin,
                admin.id,
                self.tokens.ttl(PrincipalKind::Admin),
            )
            .await?;

        info!(admin_id = admin.id, "Admin signed in");

        Ok(AdminSession {
            id: admin.id,
            username: admin.username,
            token,
        })
    }

    async fn admin_logout(&self, admin_id: i32) -> Result<(), AuthError> {
        self.tokens.revoke(PrincipalKind::Admin, admin_id).await?;
        Ok(())
    }

    async fn ensure_admin(&self) -> Result<Option<String>, AuthError> {
        if self.store.count_admins().await? > 0 {
            return Ok(None);
        }

        let (password, generated) = match &self.security.initial_admin_password {
            Some(password) => (password.clone(), false),
            None => (generate_password(GENERATED_PASSWORD_LEN), true),
        };

        let password_hash = self.hash(&password).await?;
        let admin = self
            .store
            .create_admin(&self.security.initial_admin_username, password_hash)
            .await?;

        info!(admin_id = admin.id, username = %admin.username, "Created initial admin account");

        Ok(generated.then_some(password))
    }

    async fn reset_admin_password(&self, username: &str) -> Result<String, AuthError> {
        let password = generate_password(GENERATED_PASSWORD_LEN);
        let password_hash = self.hash(&password).await?;

        if !self.store.reset_admin_password(username, password_hash).await? {
            return Err(AuthError::AdminNotFound(username.to_string()));
        }

        Ok(password)
    }
}
