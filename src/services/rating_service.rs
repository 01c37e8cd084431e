//! Domain service for user ratings.
//!
//! A user rates a mod at most once; every new rating recomputes the mod's mean
//! inside the same transaction as the insert.

use serde::Serialize;
use thiserror::Error;

use crate::models::catalog::Rating;
use crate::services::token_store::UserIdentity;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("Mod not found: {0}")]
    ModNotFound(i32),

    #[error("You have already rated this mod")]
    AlreadyRated,

    #[error("Rating must be an integer between 1 and 5")]
    OutOfRange,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for RatingError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RatingError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedStatus {
    pub has_rated: bool,
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingOutcome {
    pub rating: Rating,
    /// The mod's mean rating after this submission.
    pub average: f64,
}

#[async_trait::async_trait]
pub trait RatingService: Send + Sync {
    async fn ratings(&self, mod_id: i32) -> Result<Vec<Rating>, RatingError>;

    async fn has_rated(&self, mod_id: i32, user_id: i32) -> Result<RatedStatus, RatingError>;

    /// # Errors
    ///
    /// Returns [`RatingError::AlreadyRated`] for a second submission by the same user.
    async fn rate(
        &self,
        mod_id: i32,
        user: &UserIdentity,
        value: i32,
    ) -> Result<RatingOutcome, RatingError>;
}

/// Arithmetic mean rounded to one decimal, half away from zero.
#[must_use]
pub fn mean_rating(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let sum: i64 = values.iter().map(|v| i64::from(*v)).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / values.len() as f64;
    (mean * 10.0).round() / 10.0
}
