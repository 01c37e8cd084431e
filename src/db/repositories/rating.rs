use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{prelude::*, ratings};
use crate::models::catalog::Rating;

pub struct RatingRepository {
    conn: DatabaseConnection,
}

impl RatingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Newest first.
    pub async fn list_for_mod(&self, mod_id: i32) -> Result<Vec<Rating>> {
        let rows = Ratings::find()
            .filter(ratings::Column::ModId.eq(mod_id))
            .order_by_desc(ratings::Column::CreatedAt)
            .order_by_desc(ratings::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list ratings")?;

        Ok(rows.into_iter().map(Rating::from).collect())
    }

    pub async fn get_for_user(&self, mod_id: i32, user_id: i32) -> Result<Option<Rating>> {
        Ok(Self::find_for_user(&self.conn, mod_id, user_id)
            .await?
            .map(Rating::from))
    }

    pub async fn find_for_user<C: ConnectionTrait>(
        db: &C,
        mod_id: i32,
        user_id: i32,
    ) -> Result<Option<ratings::Model>> {
        Ratings::find()
            .filter(ratings::Column::ModId.eq(mod_id))
            .filter(ratings::Column::UserId.eq(user_id))
            .one(db)
            .await
            .context("Failed to query rating")
    }

    pub async fn count_for_mod<C: ConnectionTrait>(db: &C, mod_id: i32) -> Result<u64> {
        Ratings::find()
            .filter(ratings::Column::ModId.eq(mod_id))
            .count(db)
            .await
            .context("Failed to count ratings")
    }

    /// Unique index violations surface as a `DbErr` so callers can tell them apart.
    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        mod_id: i32,
        user_id: i32,
        username: &str,
        value: i32,
        created_at: String,
    ) -> Result<Rating> {
        let model = ratings::ActiveModel {
            mod_id: Set(mod_id),
            user_id: Set(user_id),
            username: Set(username.to_string()),
            rating: Set(value),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(Rating::from(model))
    }

    pub async fn values_for_mod<C: ConnectionTrait>(db: &C, mod_id: i32) -> Result<Vec<i32>> {
        Ratings::find()
            .select_only()
            .column(ratings::Column::Rating)
            .filter(ratings::Column::ModId.eq(mod_id))
            .into_tuple::<i32>()
            .all(db)
            .await
            .context("Failed to read rating values")
    }
}
