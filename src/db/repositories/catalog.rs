use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};

use crate::entities::{mods, prelude::*};
use crate::models::catalog::{Mod, ModFields, ModSort, encode_tags};

pub struct ModRepository {
    conn: DatabaseConnection,
}

impl ModRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, category: Option<&str>, sort: ModSort) -> Result<Vec<Mod>> {
        let mut query = Mods::find();

        if let Some(category) = category {
            query = query.filter(mods::Column::Category.eq(category));
        }

        query = match sort {
            ModSort::Default => query,
            ModSort::Rating => query.order_by_desc(mods::Column::Rating),
            ModSort::Downloads => query.order_by_desc(mods::Column::Downloads),
            ModSort::Name => query.order_by(Expr::cust("name COLLATE NOCASE"), Order::Asc),
        };

        let rows = query
            .order_by_asc(mods::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list mods")?;

        Ok(rows.into_iter().map(Mod::from).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<Mod>> {
        Ok(Self::find(&self.conn, id).await?.map(Mod::from))
    }

    pub async fn create(&self, fields: ModFields, created_at: String) -> Result<Mod> {
        let model = mods::ActiveModel {
            name: Set(fields.name),
            description: Set(fields.description),
            category: Set(fields.category),
            tags: Set(encode_tags(&fields.tags)),
            rating: Set(fields.rating.unwrap_or(0.0)),
            downloads: Set(fields.downloads.unwrap_or(0)),
            icon: Set(fields.icon),
            cloud_link: Set(fields.cloud_link),
            source_link: Set(fields.source_link),
            background_image: Set(fields.background_image),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(Mod::from(model))
    }

    pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<mods::Model>> {
        Mods::find_by_id(id)
            .one(db)
            .await
            .context("Failed to query mod by ID")
    }

    /// Replaces the editable fields. `keep_rating` leaves the derived rating untouched.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        existing: mods::Model,
        fields: ModFields,
        keep_rating: bool,
    ) -> Result<Mod> {
        let current_downloads = existing.downloads;
        let mut active: mods::ActiveModel = existing.into();
        active.name = Set(fields.name);
        active.description = Set(fields.description);
        active.category = Set(fields.category);
        active.tags = Set(encode_tags(&fields.tags));
        active.icon = Set(fields.icon);
        active.cloud_link = Set(fields.cloud_link);
        active.source_link = Set(fields.source_link);
        active.background_image = Set(fields.background_image);
        if let Some(rating) = fields.rating.filter(|_| !keep_rating) {
            active.rating = Set(rating);
        }
        if let Some(downloads) = fields.downloads.filter(|d| *d > current_downloads) {
            active.downloads = Set(downloads);
        }
        let model = active.update(db).await?;

        Ok(Mod::from(model))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64> {
        let result = Mods::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected)
    }

    /// `downloads = downloads + 1` in a single statement. Returns false for an unknown id.
    pub async fn increment_downloads<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool> {
        let result = Mods::update_many()
            .col_expr(
                mods::Column::Downloads,
                Expr::col(mods::Column::Downloads).add(1),
            )
            .filter(mods::Column::Id.eq(id))
            .exec(db)
            .await
            .context("Failed to increment downloads")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn downloads<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<i64>> {
        Mods::find_by_id(id)
            .select_only()
            .column(mods::Column::Downloads)
            .into_tuple::<i64>()
            .one(db)
            .await
            .context("Failed to read download count")
    }

    pub async fn set_rating<C: ConnectionTrait>(db: &C, id: i32, rating: f64) -> Result<()> {
        Mods::update_many()
            .col_expr(mods::Column::Rating, Expr::value(rating))
            .filter(mods::Column::Id.eq(id))
            .exec(db)
            .await
            .context("Failed to store mod rating")?;

        Ok(())
    }
}
