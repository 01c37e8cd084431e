use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::RateLimiter;
use crate::state::SharedState;

mod assets;
pub mod audit;
mod auth;
mod categories;
mod error;
pub mod extract;
mod logs;
mod mods;
mod observability;
mod rate_limit;
pub mod validation;

pub use error::ApiError;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    /// Registration and user login. `None` when rate limiting is disabled.
    pub user_limiter: Option<Arc<RateLimiter>>,

    pub admin_limiter: Option<Arc<RateLimiter>>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let limits = &shared.config.rate_limit;
    let (user_limiter, admin_limiter) = if limits.enabled {
        (
            Some(Arc::new(RateLimiter::from_config(limits))),
            Some(Arc::new(RateLimiter::from_config(limits))),
        )
    } else {
        (None, None)
    };

    Arc::new(AppState {
        shared,
        user_limiter,
        admin_limiter,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let (static_dir, cors_origins) = {
        let config = state.config();
        (
            config.general.static_dir.clone(),
            config.server.cors_allowed_origins.clone(),
        )
    };

    let api_router = Router::new()
        .merge(user_auth_router(state.clone()))
        .merge(admin_auth_router(state.clone()))
        .merge(catalog_router())
        .merge(logs_router())
        .route("/health", get(observability::get_health))
        .route("/metrics", get(observability::get_metrics))
        .fallback(api_not_found)
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_router)
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn(assets::asset_guard))
        .layer(middleware::from_fn_with_state(
            state,
            audit::audit_middleware,
        ))
        .layer(cors_layer(&cors_origins))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
        layer.allow_origin(origins).allow_credentials(true)
    }
}

fn user_auth_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let limited = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            state,
            rate_limit::user_rate_limit,
        ));

    Router::new()
        .merge(limited)
        .route("/auth/verify", get(auth::verify))
        .route("/auth/logout", post(auth::logout))
}

fn admin_auth_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let limited = Router::new()
        .route("/admin/login", post(auth::admin_login))
        .route_layer(middleware::from_fn_with_state(
            state,
            rate_limit::admin_rate_limit,
        ));

    Router::new()
        .merge(limited)
        .route("/admin/logout", post(auth::admin_logout))
}

fn catalog_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/mods", get(mods::list_mods).post(mods::create_mod))
        .route(
            "/mods/{id}",
            get(mods::get_mod).put(mods::update_mod).delete(mods::delete_mod),
        )
        .route("/mods/{id}/download", post(mods::record_download))
        .route("/mods/{id}/ratings", get(mods::list_ratings))
        .route("/mods/{id}/rated", get(mods::has_rated))
        .route("/mods/{id}/rate", post(mods::rate_mod))
}

fn logs_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logs", get(logs::list_logs))
        .route("/logs/stats", get(logs::get_stats))
        .route("/logs/export", get(logs::export_logs))
        .route("/logs/cleanup", delete(logs::cleanup_logs))
        .route("/logs/{id}", get(logs::get_log))
}

async fn api_not_found() -> ApiError {
    ApiError::NotFound("接口不存在".to_string())
}
