//! `SeaORM` implementation of the `RatingService` trait.

use crate::db::repositories::catalog::ModRepository;
use crate::db::repositories::rating::RatingRepository;
use crate::db::{Store, is_unique_violation, now_timestamp};
use crate::models::catalog::Rating;
use crate::services::rating_service::{
    RatedStatus, RatingError, RatingOutcome, RatingService, mean_rating,
};
use crate::services::token_store::UserIdentity;
use async_trait::async_trait;
use tracing::info;

pub struct SeaOrmRatingService {
    store: Store,
}

impl SeaOrmRatingService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn require_mod(&self, mod_id: i32) -> Result<(), RatingError> {
        match self.store.get_mod(mod_id).await? {
            Some(_) => Ok(()),
            None => Err(RatingError::ModNotFound(mod_id)),
        }
    }
}

#[async_trait]
impl RatingService for SeaOrmRatingService {
    async fn ratings(&self, mod_id: i32) -> Result<Vec<Rating>, RatingError> {
        self.require_mod(mod_id).await?;
        Ok(self.store.list_ratings(mod_id).await?)
    }

    async fn has_rated(&self, mod_id: i32, user_id: i32) -> Result<RatedStatus, RatingError> {
        self.require_mod(mod_id).await?;

        let existing = self.store.get_user_rating(mod_id, user_id).await?;
        Ok(RatedStatus {
            has_rated: existing.is_some(),
            rating: existing.map(|r| r.rating),
        })
    }

    async fn rate(
        &self,
        mod_id: i32,
        user: &UserIdentity,
        value: i32,
    ) -> Result<RatingOutcome, RatingError> {
        if !(1..=5).contains(&value) {
            return Err(RatingError::OutOfRange);
        }

        self.require_mod(mod_id).await?;

        if self.store.get_user_rating(mod_id, user.id).await?.is_some() {
            return Err(RatingError::AlreadyRated);
        }

        let user_id = user.id;
        let username = user.username.clone();

        // The insert comes first so the transaction takes the write lock
        // before reading; a racing duplicate trips the unique index instead.
        let outcome = self
            .store
            .transaction(move |txn| {
                Box::pin(async move {
                    let rating = RatingRepository::insert(
                        txn,
                        mod_id,
                        user_id,
                        &username,
                        value,
                        now_timestamp(),
                    )
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            RatingError::AlreadyRated
                        } else {
                            e.into()
                        }
                    })?;

                    let values = RatingRepository::values_for_mod(txn, mod_id).await?;
                    let average = mean_rating(&values);
                    ModRepository::set_rating(txn, mod_id, average).await?;

                    Ok::<_, RatingError>(RatingOutcome { rating, average })
                })
            })
            .await?;

        info!(
            mod_id,
            user_id,
            rating = value,
            average = outcome.average,
            "Rating recorded"
        );

        Ok(outcome)
    }
}
