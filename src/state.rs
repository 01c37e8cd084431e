use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, CatalogService, LogService, RatingService, SeaOrmAuthService,
    SeaOrmCatalogService, SeaOrmLogService, SeaOrmRatingService, TokenStore,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: TokenStore,

    pub auth_service: Arc<dyn AuthService>,

    pub catalog_service: Arc<dyn CatalogService>,

    pub rating_service: Arc<dyn RatingService>,

    pub log_service: Arc<dyn LogService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    /// Wires the services around an already opened store.
    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let tokens = TokenStore::new(store.clone(), &config.security);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let catalog_service =
            Arc::new(SeaOrmCatalogService::new(store.clone())) as Arc<dyn CatalogService>;

        let rating_service =
            Arc::new(SeaOrmRatingService::new(store.clone())) as Arc<dyn RatingService>;

        let log_service = Arc::new(SeaOrmLogService::new(
            store.clone(),
            config.logs.vacuum_threshold,
        )) as Arc<dyn LogService>;

        Self {
            config: Arc::new(config),
            store,
            tokens,
            auth_service,
            catalog_service,
            rating_service,
            log_service,
        }
    }
}
