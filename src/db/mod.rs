use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    SqlErr, Statement, TransactionError, TransactionTrait,
};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use tracing::info;

use crate::models::api_log::{ApiLogEntry, ApiLogSummary, LogFilter, NewApiLog};
use crate::models::catalog::{Category, Mod, ModFields, ModSort, Rating};

pub mod migrator;
pub mod repositories;

pub use repositories::admin::Admin;
pub use repositories::user::{TokenHolder, User};

/// Boxed unit of work handed to [`Store::transaction`].
pub type TxFuture<'c, T, E> = Pin<Box<dyn Future<Output = std::result::Result<T, E>> + Send + 'c>>;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        if !in_memory {
            conn.execute_unprepared("PRAGMA journal_mode=WAL").await?;
        }

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Runs `work` inside one transaction: committed when it returns `Ok`,
    /// rolled back on any `Err`.
    pub async fn transaction<F, T, E>(&self, work: F) -> std::result::Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> TxFuture<'c, T, E> + Send,
        T: Send,
        E: From<DbErr> + std::fmt::Display + std::fmt::Debug + Send,
    {
        self.conn
            .transaction(work)
            .await
            .map_err(|err| match err {
                TransactionError::Connection(db) => E::from(db),
                TransactionError::Transaction(inner) => inner,
            })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn admin_repo(&self) -> repositories::admin::AdminRepository {
        repositories::admin::AdminRepository::new(self.conn.clone())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    fn mod_repo(&self) -> repositories::catalog::ModRepository {
        repositories::catalog::ModRepository::new(self.conn.clone())
    }

    fn rating_repo(&self) -> repositories::rating::RatingRepository {
        repositories::rating::RatingRepository::new(self.conn.clone())
    }

    pub(crate) fn logs_repo(&self) -> repositories::logs::LogRepository {
        repositories::logs::LogRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        self.user_repo().username_exists(username).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        self.user_repo().email_exists(email).await
    }

    pub async fn get_user_with_password(&self, username: &str) -> Result<Option<(User, String)>> {
        self.user_repo().get_with_password(username).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, password_hash, now_timestamp())
            .await
    }

    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<TokenHolder<User>>> {
        self.user_repo().get_by_token(token).await
    }

    pub async fn set_user_token(&self, id: i32, token: &str, expires: &str) -> Result<bool> {
        self.user_repo().set_token(id, token, expires).await
    }

    pub async fn clear_user_token(&self, id: i32) -> Result<()> {
        self.user_repo().clear_token(id).await
    }

    pub async fn clear_user_token_if_current(&self, id: i32, token: &str) -> Result<()> {
        self.user_repo().clear_token_if_current(id, token).await
    }

    pub async fn clear_expired_user_tokens(&self, now: &str) -> Result<u64> {
        self.user_repo().clear_expired_tokens(now).await
    }

    // Admins

    pub async fn count_admins(&self) -> Result<u64> {
        self.admin_repo().count().await
    }

    pub async fn get_admin_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(Admin, String)>> {
        self.admin_repo().get_with_password(username).await
    }

    pub async fn create_admin(&self, username: &str, password_hash: String) -> Result<Admin> {
        self.admin_repo()
            .create(username, password_hash, now_timestamp())
            .await
    }

    pub async fn reset_admin_password(&self, username: &str, password_hash: String) -> Result<bool> {
        self.admin_repo().reset_password(username, password_hash).await
    }

    pub async fn get_admin_by_token(&self, token: &str) -> Result<Option<TokenHolder<Admin>>> {
        self.admin_repo().get_by_token(token).await
    }

    pub async fn set_admin_token(&self, id: i32, token: &str, expires: &str) -> Result<bool> {
        self.admin_repo().set_token(id, token, expires).await
    }

    pub async fn clear_admin_token(&self, id: i32) -> Result<()> {
        self.admin_repo().clear_token(id).await
    }

    pub async fn clear_admin_token_if_current(&self, id: i32, token: &str) -> Result<()> {
        self.admin_repo().clear_token_if_current(id, token).await
    }

    pub async fn clear_expired_admin_tokens(&self, now: &str) -> Result<u64> {
        self.admin_repo().clear_expired_tokens(now).await
    }

    // Catalog

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.category_repo().list().await
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<Category>> {
        self.category_repo().get(id).await
    }

    pub async fn category_exists(&self, name: &str) -> Result<bool> {
        self.category_repo().exists(name).await
    }

    pub async fn create_category(
        &self,
        name: &str,
        icon: &str,
        description: &str,
    ) -> Result<Category> {
        self.category_repo().create(name, icon, description).await
    }

    pub async fn list_mods(&self, category: Option<&str>, sort: ModSort) -> Result<Vec<Mod>> {
        self.mod_repo().list(category, sort).await
    }

    pub async fn get_mod(&self, id: i32) -> Result<Option<Mod>> {
        self.mod_repo().get(id).await
    }

    pub async fn create_mod(&self, fields: ModFields) -> Result<Mod> {
        self.mod_repo().create(fields, now_timestamp()).await
    }

    pub async fn list_ratings(&self, mod_id: i32) -> Result<Vec<Rating>> {
        self.rating_repo().list_for_mod(mod_id).await
    }

    pub async fn get_user_rating(&self, mod_id: i32, user_id: i32) -> Result<Option<Rating>> {
        self.rating_repo().get_for_user(mod_id, user_id).await
    }

    // Audit log

    pub async fn add_api_log(&self, entry: NewApiLog) -> Result<()> {
        self.logs_repo().add(entry, now_timestamp()).await
    }

    pub async fn get_api_logs(
        &self,
        filter: &LogFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ApiLogSummary>, u64)> {
        self.logs_repo().get_logs(filter, page, limit).await
    }

    pub async fn get_api_log(&self, id: i32) -> Result<Option<ApiLogEntry>> {
        self.logs_repo().get(id).await
    }
}

/// Timestamps are stored as RFC 3339 UTC with millisecond precision so that
/// string order matches time order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// True when `err` wraps a unique constraint violation from the database.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>()
        .and_then(DbErr::sql_err)
        .is_some_and(|e| matches!(e, SqlErr::UniqueConstraintViolation(_)))
}
