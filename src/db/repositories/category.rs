use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, sea_query::Expr,
};

use crate::entities::{categories, mods, prelude::*};
use crate::models::catalog::Category;

pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let rows = Categories::find()
            .order_by_asc(categories::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list categories")?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<Category>> {
        Ok(Self::find(&self.conn, id).await?.map(Category::from))
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        let count = Categories::find()
            .filter(categories::Column::Name.eq(name))
            .count(&self.conn)
            .await
            .context("Failed to look up category by name")?;

        Ok(count > 0)
    }

    pub async fn create(&self, name: &str, icon: &str, description: &str) -> Result<Category> {
        let model = categories::ActiveModel {
            name: Set(name.to_string()),
            icon: Set(icon.to_string()),
            description: Set(description.to_string()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(Category::from(model))
    }

    pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<categories::Model>> {
        Categories::find_by_id(id)
            .one(db)
            .await
            .context("Failed to query category by ID")
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        existing: categories::Model,
        name: &str,
        icon: &str,
        description: &str,
    ) -> Result<Category> {
        let mut active: categories::ActiveModel = existing.into();
        active.name = Set(name.to_string());
        active.icon = Set(icon.to_string());
        active.description = Set(description.to_string());
        let model = active.update(db).await?;

        Ok(Category::from(model))
    }

    /// Number of mods that name this category.
    pub async fn mod_count<C: ConnectionTrait>(db: &C, name: &str) -> Result<u64> {
        Mods::find()
            .filter(mods::Column::Category.eq(name))
            .count(db)
            .await
            .context("Failed to count mods in category")
    }

    pub async fn rename_references<C: ConnectionTrait>(
        db: &C,
        old_name: &str,
        new_name: &str,
    ) -> Result<u64> {
        let result = Mods::update_many()
            .col_expr(mods::Column::Category, Expr::value(new_name))
            .filter(mods::Column::Category.eq(old_name))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64> {
        let result = Categories::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected)
    }
}
