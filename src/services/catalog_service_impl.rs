//! `SeaORM` implementation of the `CatalogService` trait.

use crate::db::repositories::catalog::ModRepository;
use crate::db::repositories::category::CategoryRepository;
use crate::db::repositories::rating::RatingRepository;
use crate::db::{Store, is_unique_violation};
use crate::models::catalog::{Category, Mod, ModFields, ModSort};
use crate::services::catalog_service::{CatalogError, CatalogService, CategoryFields};
use async_trait::async_trait;
use tracing::info;

pub struct SeaOrmCatalogService {
    store: Store,
}

impl SeaOrmCatalogService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn require_category(&self, name: &str) -> Result<(), CatalogError> {
        if self.store.category_exists(name).await? {
            Ok(())
        } else {
            Err(CatalogError::UnknownCategory(name.to_string()))
        }
    }
}

fn map_name_conflict(err: anyhow::Error) -> CatalogError {
    if is_unique_violation(&err) {
        CatalogError::CategoryNameTaken
    } else {
        err.into()
    }
}

#[async_trait]
impl CatalogService for SeaOrmCatalogService {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    async fn get_category(&self, id: i32) -> Result<Category, CatalogError> {
        self.store
            .get_category(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))
    }

    async fn create_category(&self, fields: CategoryFields) -> Result<Category, CatalogError> {
        let category = self
            .store
            .create_category(&fields.name, &fields.icon, &fields.description)
            .await
            .map_err(map_name_conflict)?;

        info!(category_id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i32,
        fields: CategoryFields,
    ) -> Result<Category, CatalogError> {
        self.store
            .transaction(move |txn| {
                Box::pin(async move {
                    let existing = CategoryRepository::find(txn, id)
                        .await?
                        .ok_or(CatalogError::CategoryNotFound(id))?;
                    let old_name = existing.name.clone();

                    let updated = CategoryRepository::update(
                        txn,
                        existing,
                        &fields.name,
                        &fields.icon,
                        &fields.description,
                    )
                    .await
                    .map_err(map_name_conflict)?;

                    if old_name != updated.name {
                        let moved =
                            CategoryRepository::rename_references(txn, &old_name, &updated.name)
                                .await?;
                        info!(from = %old_name, to = %updated.name, mods = moved, "Category renamed");
                    }

                    Ok(updated)
                })
            })
            .await
    }

    async fn delete_category(&self, id: i32) -> Result<Category, CatalogError> {
        self.store
            .transaction(move |txn| {
                Box::pin(async move {
                    let existing = CategoryRepository::find(txn, id)
                        .await?
                        .ok_or(CatalogError::CategoryNotFound(id))?;

                    let mod_count = CategoryRepository::mod_count(txn, &existing.name).await?;
                    if mod_count > 0 {
                        return Err(CatalogError::CategoryInUse(mod_count));
                    }

                    CategoryRepository::delete(txn, id).await?;
                    Ok(Category::from(existing))
                })
            })
            .await
    }

    async fn list_mods(
        &self,
        category: Option<&str>,
        sort: ModSort,
    ) -> Result<Vec<Mod>, CatalogError> {
        let category = category.filter(|c| *c != "all");

        if let Some(name) = category {
            self.require_category(name).await?;
        }

        Ok(self.store.list_mods(category, sort).await?)
    }

    async fn get_mod(&self, id: i32) -> Result<Mod, CatalogError> {
        self.store
            .get_mod(id)
            .await?
            .ok_or(CatalogError::ModNotFound(id))
    }

    async fn create_mod(&self, fields: ModFields) -> Result<Mod, CatalogError> {
        self.require_category(&fields.category).await?;

        let created = self.store.create_mod(fields).await?;
        info!(mod_id = created.id, name = %created.name, "Mod created");
        Ok(created)
    }

    async fn update_mod(&self, id: i32, fields: ModFields) -> Result<Mod, CatalogError> {
        self.require_category(&fields.category).await?;

        self.store
            .transaction(move |txn| {
                Box::pin(async move {
                    let existing = ModRepository::find(txn, id)
                        .await?
                        .ok_or(CatalogError::ModNotFound(id))?;

                    // Once ratings exist the stored rating is derived from them.
                    let has_ratings = RatingRepository::count_for_mod(txn, id).await? > 0;

                    Ok(ModRepository::update(txn, existing, fields, has_ratings).await?)
                })
            })
            .await
    }

    async fn delete_mod(&self, id: i32) -> Result<Mod, CatalogError> {
        let deleted = self
            .store
            .transaction(move |txn| {
                Box::pin(async move {
                    let existing = ModRepository::find(txn, id)
                        .await?
                        .ok_or(CatalogError::ModNotFound(id))?;

                    ModRepository::delete(txn, id).await?;
                    Ok::<_, CatalogError>(Mod::from(existing))
                })
            })
            .await?;

        info!(mod_id = deleted.id, name = %deleted.name, "Mod deleted");
        Ok(deleted)
    }

    async fn record_download(&self, id: i32) -> Result<i64, CatalogError> {
        self.store
            .transaction(move |txn| {
                Box::pin(async move {
                    if !ModRepository::increment_downloads(txn, id).await? {
                        return Err(CatalogError::ModNotFound(id));
                    }

                    ModRepository::downloads(txn, id)
                        .await?
                        .ok_or(CatalogError::ModNotFound(id))
                })
            })
            .await
    }
}
