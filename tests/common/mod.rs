#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use modhub::api::AppState;
use modhub::config::Config;
use modhub::state::SharedState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-test-password";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
}

/// Config with a throwaway database file and argon2 costs low enough for tests.
pub fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("modhub-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.general.static_dir = std::env::temp_dir().display().to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.security.initial_admin_username = ADMIN_USERNAME.to_string();
    config.security.initial_admin_password = Some(ADMIN_PASSWORD.to_string());
    config.rate_limit.enabled = false;
    config.scheduler.enabled = false;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let mut config = test_config();
    configure(&mut config);

    let shared = Arc::new(
        SharedState::new(config)
            .await
            .expect("failed to create shared state"),
    );
    shared
        .auth_service
        .ensure_admin()
        .await
        .expect("failed to create admin");

    let state = modhub::api::create_app_state(shared, None);
    let router = modhub::api::router(state.clone());

    TestApp { state, router }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.raw_request(method, uri, token, body).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn raw_request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("X-Forwarded-For", "203.0.113.7");

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    /// Registers a user and returns their token.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "secret123",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["user"]["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .post(
                "/api/admin/login",
                None,
                serde_json::json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["admin"]["token"].as_str().unwrap().to_string()
    }

    pub async fn create_mod(&self, admin: &str, name: &str, category: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/mods",
                Some(admin),
                serde_json::json!({
                    "name": name,
                    "description": "integration test mod",
                    "category": category,
                    "tags": ["test"],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create mod failed: {body}");
        body["id"].as_i64().unwrap()
    }

    pub fn shared(&self) -> &SharedState {
        &self.state.shared
    }
}
