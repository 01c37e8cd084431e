//! Registration, login and bearer-token flows for users and admins.

mod common;

use axum::http::StatusCode;
use common::spawn_app;
use modhub::services::PrincipalKind;
use serde_json::json;

#[tokio::test]
async fn test_register_login_verify_logout() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "alice", "email": "alice@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"]["password"].is_null());
    let first_token = body["user"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/auth/verify", Some(&first_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "alice@example.com");

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "username": "alice", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second_token = body["user"]["token"].as_str().unwrap().to_string();
    assert_ne!(first_token, second_token);

    // Logging in again replaces the previous token.
    let (status, _) = app.get("/api/auth/verify", Some(&first_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/auth/logout", Some(&second_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/auth/verify", Some(&second_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "无效的认证令牌");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = spawn_app().await;
    app.register("bob").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "bob", "email": "other@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "用户名已存在");

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "bobby", "email": "bob@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "邮箱已被注册");

    let (status, _) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "a".repeat(21), "email": "long@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "short", "email": "short@example.com", "password": "12345" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "nomail", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "用户名、密码和邮箱不能为空");
}

#[tokio::test]
async fn test_login_failures() {
    let app = spawn_app().await;
    app.register("carol").await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "username": "carol", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "用户名或密码错误");

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "username": "nobody", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "username": "carol", "password": "x".repeat(51) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "密码过长");
}

#[tokio::test]
async fn test_missing_and_cross_kind_tokens() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/auth/verify", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "未提供认证令牌");

    let user_token = app.register("dave").await;
    let admin_token = app.admin_token().await;

    let (status, _) = app
        .post(
            "/api/categories",
            Some(&user_token),
            json!({ "name": "blocked", "icon": "x", "description": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/auth/verify", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/admin/logout", Some(&admin_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/logs/stats", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_login_rejects_wrong_password() {
    let app = spawn_app().await;

    let (status, _) = app
        .post(
            "/api/admin/login",
            None,
            json!({ "username": common::ADMIN_USERNAME, "password": "not-it" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected_and_swept() {
    let app = spawn_app().await;

    let (_, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "erin", "email": "erin@example.com", "password": "secret123" }),
        )
        .await;
    let user_id = i32::try_from(body["user"]["id"].as_i64().unwrap()).unwrap();

    let tokens = &app.shared().tokens;
    let expired = tokens
        .issue(PrincipalKind::User, user_id, chrono::Duration::seconds(-1))
        .await
        .unwrap();

    let report = tokens.sweep_expired().await.unwrap();
    assert_eq!(report.users, 1);
    assert_eq!(report.admins, 0);

    let (status, _) = app.get("/api/auth/verify", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Lazily cleared on lookup as well.
    let expired = tokens
        .issue(PrincipalKind::User, user_id, chrono::Duration::seconds(-1))
        .await
        .unwrap();
    let (status, _) = app.get("/api/auth/verify", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(tokens.sweep_expired().await.unwrap().users, 0);
}

#[tokio::test]
async fn test_login_rate_limit() {
    let app = common::spawn_app_with(|config| {
        config.rate_limit.enabled = true;
        config.rate_limit.max_requests = 3;
        config.rate_limit.window_seconds = 60;
    })
    .await;

    for _ in 0..3 {
        let (status, _) = app
            .post(
                "/api/auth/login",
                None,
                json!({ "username": "ghost", "password": "secret123" }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app
        .raw_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "ghost", "password": "secret123" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Admin login keeps its own budget.
    let (status, _) = app
        .post(
            "/api/admin/login",
            None,
            json!({ "username": common::ADMIN_USERNAME, "password": common::ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Unlimited endpoints are unaffected.
    let (status, _) = app.get("/api/categories", None).await;
    assert_eq!(status, StatusCode::OK);
}
