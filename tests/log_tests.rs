//! Audit logging middleware and the admin log endpoints.

mod common;

use axum::http::{StatusCode, header};
use common::{TestApp, spawn_app};
use http_body_util::BodyExt;
use modhub::entities::api_logs;
use modhub::models::api_log::NewApiLog;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{Value, json};

async fn logs_for(app: &TestApp, admin: &str, query: &str) -> Value {
    let (status, body) = app.get(&format!("/api/logs?{query}"), Some(admin)).await;
    assert_eq!(status, StatusCode::OK, "log listing failed: {body}");
    body
}

async fn record(app: &TestApp, path: &str, error: Option<&str>) {
    app.shared()
        .log_service
        .record(NewApiLog {
            method: "GET".to_string(),
            path: path.to_string(),
            ip: "198.51.100.1".to_string(),
            status_code: if error.is_some() { 500 } else { 200 },
            response_time_ms: 12,
            error: error.map(String::from),
            ..Default::default()
        })
        .await
        .unwrap();
}

async fn insert_dated(app: &TestApp, path: &str, created_at: &str) {
    api_logs::ActiveModel {
        method: Set("GET".to_string()),
        path: Set(path.to_string()),
        ip: Set("198.51.100.2".to_string()),
        status_code: Set(200),
        response_time: Set(5),
        created_at: Set(created_at.to_string()),
        ..Default::default()
    }
    .insert(&app.shared().store.conn)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_requests_are_audited() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user = app.register("frank").await;

    app.get("/api/auth/verify", Some(&user)).await;
    app.get("/api/mods/9999", None).await;

    let body = logs_for(&app, &admin, "path=/api/auth/register").await;
    let entry = &body["logs"][0];
    assert_eq!(entry["method"], "POST");
    assert_eq!(entry["status_code"], 201);
    assert_eq!(entry["ip"], "203.0.113.7");
    let preview = entry["request_body_preview"].as_str().unwrap();
    assert!(preview.contains("frank"));
    assert!(!preview.contains("password"));
    assert!(!preview.contains("secret123"));

    let body = logs_for(&app, &admin, "path=/api/auth/verify").await;
    assert_eq!(body["logs"][0]["username"], "frank");
    assert!(body["logs"][0]["user_id"].is_number());

    let body = logs_for(&app, &admin, "statusCode=404&method=get").await;
    assert_eq!(body["pagination"]["total"], 1);
    let entry = &body["logs"][0];
    assert_eq!(entry["path"], "/api/mods/9999");
    assert!(entry["error_preview"].as_str().unwrap().contains("模组未找到"));

    let body = logs_for(&app, &admin, "path=/api/admin/login").await;
    let preview = body["logs"][0]["request_body_preview"].as_str().unwrap();
    assert!(!preview.contains(common::ADMIN_PASSWORD));
}

#[tokio::test]
async fn test_credential_endpoints_ignore_bearer_tokens() {
    let app = common::spawn_app_with(|config| {
        config.rate_limit.enabled = true;
        config.rate_limit.max_requests = 2;
        config.rate_limit.window_seconds = 60;
    })
    .await;
    let user = app.register("henry").await;

    let login = json!({ "username": "henry", "password": "secret123" });
    let (status, _) = app.post("/api/auth/login", Some(&user), login.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/api/auth/login", Some(&user), login).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let admin = app.admin_token().await;
    let body = logs_for(&app, &admin, "path=/api/auth/login").await;
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["status_code"], 429);
    assert!(logs.iter().all(|entry| entry["user_id"].is_null()));
}

#[tokio::test]
async fn test_log_endpoints_are_not_audited() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    app.get("/api/logs/stats", Some(&admin)).await;
    app.get("/api/logs", Some(&admin)).await;

    let body = logs_for(&app, &admin, "path=/api/logs").await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_log_endpoints_require_admin() {
    let app = spawn_app().await;
    let user = app.register("grace").await;

    let (status, _) = app.get("/api/logs", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/logs", Some(&user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request("DELETE", "/api/logs/cleanup", Some(&user), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_listing_validation_and_pagination() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    for n in 0..7 {
        record(&app, &format!("/api/paged/{n}"), None).await;
    }

    let body = logs_for(&app, &admin, "path=/api/paged&limit=3&page=2").await;
    assert_eq!(body["pagination"]["total"], 7);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["logs"].as_array().unwrap().len(), 3);
    assert_eq!(body["logs"][0]["path"], "/api/paged/3");

    for query in ["limit=500", "page=0", "method=TRACE", "statusCode=99", "userId=abc"] {
        let (status, _) = app.get(&format!("/api/logs?{query}"), Some(&admin)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {query}");
    }

    let (status, body) = app
        .get("/api/logs?page=18446744073709551615&limit=200", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "分页参数无效");

    let body = logs_for(&app, &admin, "path=/api/paged&page=1000000&limit=200").await;
    assert_eq!(body["pagination"]["total"], 7);
    assert!(body["logs"].as_array().unwrap().is_empty());

    let (status, _) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_log_detail_and_stats() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    record(&app, "/api/detail", Some("boom")).await;

    let body = logs_for(&app, &admin, "path=/api/detail").await;
    let id = body["logs"][0]["id"].as_i64().unwrap();

    let (status, entry) = app.get(&format!("/api/logs/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["error"], "boom");

    let (status, body) = app.get("/api/logs/abc", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "无效的日志ID");

    let (status, _) = app.get("/api/logs/999999", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, stats) = app.get("/api/logs/stats", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(stats["overall"]["total"].as_i64().unwrap() >= 2);
    assert!(stats["overall"]["errorCount"].as_i64().unwrap() >= 1);
    assert!(
        stats["byMethod"]
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m["method"] == "GET")
    );
    assert!(
        stats["topIPs"]
            .as_array()
            .unwrap()
            .iter()
            .any(|ip| ip["ip"] == "198.51.100.1")
    );
    assert!(stats["topPaths"].as_array().unwrap().len() <= 10);
}

#[tokio::test]
async fn test_export_csv_and_json() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let created_at = modhub::db::now_timestamp();
    let rows: Vec<api_logs::ActiveModel> = (0..999)
        .map(|n| api_logs::ActiveModel {
            method: Set("GET".to_string()),
            path: Set(format!("/api/export/{n}")),
            ip: Set("198.51.100.3".to_string()),
            status_code: Set(200),
            response_time: Set(1),
            created_at: Set(created_at.clone()),
            ..Default::default()
        })
        .collect();
    for chunk in rows.chunks(200) {
        api_logs::Entity::insert_many(chunk.to_vec())
            .exec(&app.shared().store.conn)
            .await
            .unwrap();
    }
    record(&app, "/api/export/quoted", Some(r#"bad "quoted" value"#)).await;

    let response = app
        .raw_request("GET", "/api/logs/export?limit=5", Some(&admin), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type: mime::Mime = response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(content_type.essence_str(), mime::TEXT_CSV.essence_str());
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=logs_"));
    assert!(disposition.ends_with(".csv"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("ID,Method,Path"));
    assert!(lines[1].contains("/api/export/quoted"));
    assert!(lines[1].contains(r#""bad ""quoted"" value""#));
    assert!(lines[2].contains("/api/export/998"));
    assert!(lines[5].contains("/api/export/995"));

    let response = app
        .raw_request("GET", "/api/logs/export?limit=3&format=json", Some(&admin), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let rows: Vec<Value> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(rows.len(), 3);
    let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));

    for query in ["limit=0", "limit=10001", "format=xml"] {
        let (status, _) = app
            .get(&format!("/api/logs/export?{query}"), Some(&admin))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {query}");
    }
}

#[tokio::test]
async fn test_cleanup_removes_old_entries() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    for n in 0..3 {
        insert_dated(&app, &format!("/api/old/{n}"), "2000-01-01T00:00:00.000Z").await;
    }
    record(&app, "/api/recent", None).await;

    let (status, body) = app
        .request("DELETE", "/api/logs/cleanup?days=30", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 3);
    assert_eq!(body["message"], "成功清理3条日志记录");
    assert!(body["cutoffDate"].is_string());

    let body = logs_for(&app, &admin, "path=/api/old").await;
    assert_eq!(body["pagination"]["total"], 0);
    let body = logs_for(&app, &admin, "path=/api/recent").await;
    assert_eq!(body["pagination"]["total"], 1);

    for days in ["0", "366", "abc"] {
        let (status, body) = app
            .request(
                "DELETE",
                &format!("/api/logs/cleanup?days={days}"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "天数必须在1-365之间");
    }
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = common::spawn_app_with(|config| config.server.max_body_bytes = 64).await;

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "username": "x".repeat(200), "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
