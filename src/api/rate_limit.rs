use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::{ApiError, AppState, audit::client_ip};
use crate::services::{RateDecision, RateLimiter};

/// Guards user registration and login.
pub async fn user_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    guard(&state, state.user_limiter.as_deref(), req, next).await
}

/// Guards admin login. Counted separately from user traffic.
pub async fn admin_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    guard(&state, state.admin_limiter.as_deref(), req, next).await
}

async fn guard(
    state: &AppState,
    limiter: Option<&RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let Some(limiter) = limiter else {
        return next.run(req).await;
    };

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(
        req.headers(),
        peer,
        state.shared.config.server.trust_forwarded_headers,
    );

    match limiter.check(&ip) {
        RateDecision::Allowed { .. } => next.run(req).await,
        RateDecision::Limited { retry_after } => {
            tracing::warn!(ip = %ip, path = %req.uri().path(), "Rate limit exceeded");
            metrics::counter!("rate_limited_requests_total").increment(1);
            ApiError::TooManyRequests { retry_after }.into_response()
        }
    }
}
