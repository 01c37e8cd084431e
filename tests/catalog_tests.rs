//! Catalog browsing, administration, ratings and download counting.

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use common::spawn_app;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_seeded_catalog_listing() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);

    let (status, body) = app.get("/api/mods", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 8);

    let (_, body) = app.get("/api/mods?category=all", None).await;
    assert_eq!(body.as_array().unwrap().len(), 8);

    let (status, body) = app.get("/api/mods?category=utility&sortBy=rating", None).await;
    assert_eq!(status, StatusCode::OK);
    let mods = body.as_array().unwrap();
    assert_eq!(mods.len(), 1);
    assert_eq!(mods[0]["name"], "JEI物品管理");
    assert_eq!(mods[0]["tags"], json!(["实用", "工具"]));

    let (_, body) = app.get("/api/mods?sortBy=rating", None).await;
    let ratings: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["rating"].as_f64().unwrap())
        .collect();
    assert_eq!(ratings[0], 5.0);
    assert!(ratings.windows(2).all(|w| w[0] >= w[1]));

    let (_, body) = app.get("/api/mods?sortBy=downloads", None).await;
    assert_eq!(body[0]["downloads"], 50000);

    let (status, body) = app.get("/api/mods?sortBy=hack", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "无效的排序方式");

    let (status, body) = app.get("/api/mods?category=missing", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "无效的分类");
}

#[tokio::test]
async fn test_unknown_ids() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/mods/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "模组未找到");

    let (status, _) = app.get("/api/categories/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "接口不存在");
}

#[tokio::test]
async fn test_category_lifecycle() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, created) = app
        .post(
            "/api/categories",
            Some(&admin),
            json!({ "name": "  quests ", "icon": "📜", "description": "任务扩展" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "quests");
    let empty_id = created["id"].as_i64().unwrap();

    let (status, body) = app
        .post(
            "/api/categories",
            Some(&admin),
            json!({ "name": "quests", "icon": "📜", "description": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "分类名称已存在");

    let (status, _) = app
        .post(
            "/api/categories",
            Some(&admin),
            json!({ "name": "x".repeat(51), "icon": "x", "description": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .request(
            "PUT",
            &format!("/api/categories/{empty_id}"),
            Some(&admin),
            Some(json!({ "name": "quests", "icon": "🗺️", "description": "任务" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["icon"], "🗺️");

    let (status, deleted) = app
        .request("DELETE", &format!("/api/categories/{empty_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["name"], "quests");

    let (_, busy) = app
        .post(
            "/api/categories",
            Some(&admin),
            json!({ "name": "busy", "icon": "🐝", "description": "" }),
        )
        .await;
    let busy_id = busy["id"].as_i64().unwrap();
    for n in 0..3 {
        app.create_mod(&admin, &format!("busy mod {n}"), "busy").await;
    }

    let (status, body) = app
        .request("DELETE", &format!("/api/categories/{busy_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains('3'));

    let (status, _) = app.get(&format!("/api/categories/{busy_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_mod_administration() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .post(
            "/api/mods",
            None,
            json!({ "name": "n", "description": "d", "category": "utility" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/api/mods",
            Some(&admin),
            json!({ "name": "n", "description": "d", "category": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "无效的分类");

    let (status, _) = app
        .post(
            "/api/mods",
            Some(&admin),
            json!({ "name": "n", "description": "d", "category": "utility", "cloudLink": "ftp://x" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = app.create_mod(&admin, "Storage Drawers", "utility").await;

    let (_, created) = app.get(&format!("/api/mods/{id}"), None).await;
    assert_eq!(created["rating"], 0.0);
    assert_eq!(created["downloads"], 0);
    assert_eq!(created["cloudLink"], "");

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/mods/{id}"),
            Some(&admin),
            Some(json!({ "name": "Storage Drawers 2", "description": "d", "category": "utility" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .request(
            "PUT",
            &format!("/api/mods/{id}"),
            Some(&admin),
            Some(json!({
                "name": "Storage Drawers 2",
                "description": "more drawers",
                "category": "decoration",
                "tags": ["存储"],
                "icon": "🗄️",
                "cloudLink": "https://example.com/drawers",
                "sourceLink": "https://github.com/example/drawers",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Storage Drawers 2");
    assert_eq!(updated["category"], "decoration");
    assert_eq!(updated["sourceLink"], "https://github.com/example/drawers");

    let (status, _) = app
        .request("DELETE", &format!("/api/mods/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/api/mods/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rating_flow() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let mod_id = app.create_mod(&admin, "Rated Mod", "magic").await;
    let first = app.register("rater_one").await;
    let second = app.register("rater_two").await;
    let rate_uri = format!("/api/mods/{mod_id}/rate");

    let (status, _) = app.post(&rate_uri, None, json!({ "rating": 5 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for bad in [json!(0), json!(6), json!(3.5), json!("4"), json!(null)] {
        let (status, body) = app.post(&rate_uri, Some(&first), json!({ "rating": bad })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {bad}");
        assert_eq!(body["error"], "评分必须是1-5之间的整数");
    }

    let (status, body) = app.post(&rate_uri, Some(&first), json!({ "rating": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["rating"]["rating"], 5);
    assert_eq!(body["averageRating"], 5.0);

    let (status, body) = app.post(&rate_uri, Some(&first), json!({ "rating": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "您已经评价过这个模组了");

    let (status, body) = app.post(&rate_uri, Some(&second), json!({ "rating": 4 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["averageRating"], 4.5);

    let (_, body) = app.get(&format!("/api/mods/{mod_id}"), None).await;
    assert_eq!(body["rating"], 4.5);

    let (_, body) = app.get(&format!("/api/mods/{mod_id}/ratings"), None).await;
    let ratings = body.as_array().unwrap();
    assert_eq!(ratings.len(), 2);
    assert!(ratings.iter().any(|r| r["username"] == "rater_one"));

    let (status, body) = app
        .get(&format!("/api/mods/{mod_id}/rated"), Some(&first))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasRated"], true);
    assert_eq!(body["rating"], 5);

    let third = app.register("rater_three").await;
    let (_, body) = app
        .get(&format!("/api/mods/{mod_id}/rated"), Some(&third))
        .await;
    assert_eq!(body["hasRated"], false);

    let (status, body) = app.post(&rate_uri, Some(&third), json!({ "rating": 4.0 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"]["rating"], 4);
    assert_eq!(body["averageRating"], 4.3);

    let (status, _) = app.post("/api/mods/9999/rate", Some(&third), json!({ "rating": 3 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_duplicate_ratings() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let mod_id = app.create_mod(&admin, "Contested Mod", "magic").await;
    let token = app.register("eager_rater").await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let router = app.router.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method("POST")
                .uri(format!("/api/mods/{mod_id}/rate"))
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(json!({ "rating": 3 }).to_string()))
                .unwrap();
            let response = router.oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            (status, body)
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        if status == StatusCode::OK {
            accepted += 1;
            assert_eq!(body["averageRating"], 3.0);
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "您已经评价过这个模组了");
        }
    }
    assert_eq!(accepted, 1);

    let (_, body) = app.get(&format!("/api/mods/{mod_id}/ratings"), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.get(&format!("/api/mods/{mod_id}"), None).await;
    assert_eq!(body["rating"], 3.0);
}

#[tokio::test]
async fn test_concurrent_downloads_are_not_lost() {
    let app = spawn_app().await;

    let (_, before) = app.get("/api/mods/1", None).await;
    let initial = before["downloads"].as_i64().unwrap();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method("POST")
                .uri("/api/mods/1/download")
                .body(Body::empty())
                .unwrap();
            let response = router.oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, bytes)
        }));
    }

    for handle in handles {
        let (status, bytes) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
    }

    let (_, after) = app.get("/api/mods/1", None).await;
    assert_eq!(after["downloads"].as_i64().unwrap(), initial + 100);

    let (status, _) = app.post("/api/mods/9999/download", None, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
