//! Domain service for the mod catalog: categories, mods and download counts.

use thiserror::Error;

use crate::models::catalog::{Category, Mod, ModFields, ModSort};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Mod not found: {0}")]
    ModNotFound(i32),

    #[error("Category not found: {0}")]
    CategoryNotFound(i32),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Category name already exists")]
    CategoryNameTaken,

    #[error("该分类下还有{0}个模组，无法删除")]
    CategoryInUse(u64),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Validated category fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFields {
    pub name: String,
    pub icon: String,
    pub description: String,
}

#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    async fn get_category(&self, id: i32) -> Result<Category, CatalogError>;

    async fn create_category(&self, fields: CategoryFields) -> Result<Category, CatalogError>;

    /// Renaming also rewrites the category of every mod that used the old name.
    async fn update_category(
        &self,
        id: i32,
        fields: CategoryFields,
    ) -> Result<Category, CatalogError>;

    /// # Errors
    ///
    /// Returns [`CatalogError::CategoryInUse`] with the mod count while mods reference it.
    async fn delete_category(&self, id: i32) -> Result<Category, CatalogError>;

    /// `category` of `None` or `"all"` lists everything.
    async fn list_mods(
        &self,
        category: Option<&str>,
        sort: ModSort,
    ) -> Result<Vec<Mod>, CatalogError>;

    async fn get_mod(&self, id: i32) -> Result<Mod, CatalogError>;

    async fn create_mod(&self, fields: ModFields) -> Result<Mod, CatalogError>;

    async fn update_mod(&self, id: i32, fields: ModFields) -> Result<Mod, CatalogError>;

    /// Returns the snapshot of the deleted mod.
    async fn delete_mod(&self, id: i32) -> Result<Mod, CatalogError>;

    /// Atomically increments the download counter and returns the new value.
    async fn record_download(&self, id: i32) -> Result<i64, CatalogError>;
}
