//! Audit logging of every request/response pair.
//!
//! The middleware also resolves the caller's [`Principal`] once and hands it
//! to handlers through the request extensions, so the audit row and the
//! handler always agree on who made the call.

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{ApiError, AppState, extract::extract_token};
use crate::config::LogsConfig;
use crate::models::api_log::{NewApiLog, truncate_chars};
use crate::services::Principal;

const MAX_PATH_CHARS: usize = 500;
const MAX_USER_AGENT_CHARS: usize = 500;
const REDACTED_FIELDS: [&str; 2] = ["password", "token"];
/// Rate-limited credential endpoints; callers there are never resolved from a token.
const CREDENTIAL_PATHS: [&str; 3] = ["/api/auth/register", "/api/auth/login", "/api/admin/login"];

pub async fn audit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let config = &state.shared.config;

    let principal = if CREDENTIAL_PATHS.contains(&req.uri().path()) {
        Principal::Anonymous
    } else {
        resolve_principal(&state, req.headers()).await
    };
    record_span_identity(&principal);

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(req.headers(), peer, config.server.trust_forwarded_headers);
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|ua| truncate_chars(ua, MAX_USER_AGENT_CHARS));

    let (mut parts, body) = req.into_parts();
    parts.extensions.insert(principal.clone());

    let (response, request_body) =
        match axum::body::to_bytes(body, config.server.max_body_bytes).await {
            Ok(bytes) => {
                let preview = if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
                    body_preview(&bytes, &config.logs)
                } else {
                    None
                };
                let req = Request::from_parts(parts, Body::from(bytes));
                (next.run(req).await, preview)
            }
            Err(_) => (ApiError::PayloadTooLarge.into_response(), None),
        };

    if is_excluded(&path, &config.logs.exclude_paths) {
        return response;
    }

    let status = response.status();
    let (response, error) = if status.is_client_error() || status.is_server_error() {
        capture_error(response, config.logs.error_max_chars).await
    } else {
        (response, None)
    };

    let (user_id, username, admin_id, admin_name) = match principal {
        Principal::User(user) => (Some(user.id), Some(user.username), None, None),
        Principal::Admin(admin) => (None, None, Some(admin.id), Some(admin.username)),
        Principal::Anonymous => (None, None, None, None),
    };

    let entry = NewApiLog {
        method: method.to_string(),
        path: truncate_chars(&path, MAX_PATH_CHARS),
        ip,
        user_agent,
        status_code: status.as_u16(),
        response_time_ms: i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX),
        user_id,
        username,
        admin_id,
        admin_name,
        request_body,
        error,
    };

    if let Err(e) = state.shared.log_service.record(entry).await {
        tracing::error!(error = %e, path = %path, "Failed to write audit log entry");
    }

    response
}

async fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Principal {
    let Some(token) = extract_token(headers) else {
        return Principal::Anonymous;
    };

    match state.shared.tokens.resolve(&token).await {
        Ok(principal) => principal,
        Err(e) => {
            tracing::error!(error = %e, "Token lookup failed");
            Principal::Anonymous
        }
    }
}

fn record_span_identity(principal: &Principal) {
    match principal {
        Principal::User(user) => {
            tracing::Span::current().record("user_id", user.id);
        }
        Principal::Admin(admin) => {
            tracing::Span::current().record("admin_id", admin.id);
        }
        Principal::Anonymous => {}
    }
}

fn is_excluded(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

/// Buffers an error response so its body can be previewed, then rebuilds it.
async fn capture_error(response: Response, max_chars: usize) -> (Response, Option<String>) {
    let (parts, body) = response.into_parts();

    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let preview = (!bytes.is_empty())
                .then(|| truncate_chars(&String::from_utf8_lossy(&bytes), max_chars));
            (Response::from_parts(parts, Body::from(bytes)), preview)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not read error response body for audit");
            (Response::from_parts(parts, Body::empty()), None)
        }
    }
}

/// JSON object bodies only, with credential fields removed.
fn body_preview(bytes: &Bytes, config: &LogsConfig) -> Option<String> {
    let serde_json::Value::Object(mut fields) = serde_json::from_slice(bytes).ok()? else {
        return None;
    };

    for key in REDACTED_FIELDS {
        fields.remove(key);
    }

    if fields.is_empty() {
        return None;
    }

    let serialized = serde_json::Value::Object(fields).to_string();
    let preview = truncate_chars(&serialized, config.body_preview_chars);
    Some(truncate_chars(&preview, config.body_max_chars))
}

/// Best-effort client address: first forwarded hop when proxies are trusted,
/// then the direct peer.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(ip) = forwarded.or_else(real_ip) {
            return ip.to_string();
        }
    }

    peer.map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn preview(body: &str) -> Option<String> {
        body_preview(&Bytes::from(body.to_string()), &LogsConfig::default())
    }

    #[test]
    fn test_body_preview_strips_credentials() {
        let preview = preview(r#"{"username":"steve","password":"hunter22","token":"abc"}"#);
        assert_eq!(preview, Some(r#"{"username":"steve"}"#.to_string()));
    }

    #[test]
    fn test_body_preview_skips_empty_and_non_objects() {
        assert_eq!(preview(r#"{"password":"x"}"#), None);
        assert_eq!(preview("[1,2,3]"), None);
        assert_eq!(preview("username=steve&password=x"), None);
        assert_eq!(preview(""), None);
    }

    #[test]
    fn test_body_preview_is_capped() {
        let long = format!(r#"{{"description":"{}"}}"#, "x".repeat(2000));
        let preview = preview(&long).unwrap();
        assert_eq!(preview.chars().count(), 500);
    }

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(client_ip(&headers, Some(peer), true), "203.0.113.7");
        assert_eq!(client_ip(&headers, Some(peer), false), "127.0.0.1");
    }

    #[test]
    fn test_client_ip_fallbacks() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers, None, true), "198.51.100.4");
        assert_eq!(client_ip(&HeaderMap::new(), None, true), "unknown");
    }

    #[test]
    fn test_is_excluded() {
        let prefixes = LogsConfig::default().exclude_paths;
        assert!(is_excluded("/api/logs/stats", &prefixes));
        assert!(is_excluded("/logs.js", &prefixes));
        assert!(!is_excluded("/api/mods", &prefixes));
    }
}
