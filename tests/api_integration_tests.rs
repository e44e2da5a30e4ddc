//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each admin endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use response_cache::{
    api::{create_router, BACKEND_HEADER},
    backend::{FsBackend, FsOptions, MemoryBackend},
    AppState, Cache, CacheOptions,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    let cache = Cache::new(Arc::new(MemoryBackend::new()), CacheOptions::default());
    create_router(AppState::new(cache))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn put_entry(key: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/entry/{key}"))
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Entry Endpoint Tests ==

#[tokio::test]
async fn test_put_entry_success() {
    let app = create_test_app();

    let response = app
        .oneshot(put_entry("users", r#"{"content":"[1,2]","duration":"2 minutes"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"].as_str().unwrap(), "users");
    assert_eq!(json["duration_ms"].as_i64().unwrap(), 120_000);
}

#[tokio::test]
async fn test_get_entry_returns_raw_content() {
    let app = create_test_app();

    let put_response = app
        .clone()
        .oneshot(put_entry("greeting", r#"{"content":"hello world"}"#))
        .await
        .unwrap();
    assert_eq!(put_response.status(), StatusCode::OK);

    let get_response = app.oneshot(get("/entry/greeting")).await.unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    assert_eq!(get_response.headers()[BACKEND_HEADER], "memory");
    assert_eq!(body_to_string(get_response.into_body()).await, "hello world");
}

#[tokio::test]
async fn test_get_entry_not_found() {
    let app = create_test_app();

    let response = app.oneshot(get("/entry/nonexistent_key")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_zero_duration_not_cached() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_entry("brief", r#"{"content":"x","duration":0}"#))
        .await
        .unwrap();

    let response = app.oneshot(get("/entry/brief")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app
        .oneshot(put_entry("bad", r#"{"content": }"#))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_blank_group_request() {
    let app = create_test_app();

    let response = app
        .oneshot(put_entry("key", r#"{"content":"v","group":" "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == Index Endpoint Tests ==

#[tokio::test]
async fn test_index_lists_keys_and_groups() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_entry("u1", r#"{"content":"a","group":"users"}"#))
        .await
        .unwrap();
    app.clone()
        .oneshot(put_entry("home", r#"{"content":"b"}"#))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/index")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["all"], serde_json::json!(["home", "u1"]));
    assert_eq!(json["groups"]["users"], serde_json::json!(["u1"]));

    let response = app.oneshot(get("/index/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["keys"], serde_json::json!(["u1"]));
}

#[tokio::test]
async fn test_unknown_group_not_found() {
    let app = create_test_app();

    let response = app.oneshot(get("/index/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Clear Endpoint Tests ==

#[tokio::test]
async fn test_clear_group() {
    let app = create_test_app();

    for (key, body) in [
        ("a", r#"{"content":"1","group":"g"}"#),
        ("b", r#"{"content":"2","group":"g"}"#),
        ("c", r#"{"content":"3"}"#),
    ] {
        app.clone().oneshot(put_entry(key, body)).await.unwrap();
    }

    let response = app.clone().oneshot(delete("/clear/g")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"].as_u64().unwrap(), 2);

    let a = app.clone().oneshot(get("/entry/a")).await.unwrap();
    let c = app.clone().oneshot(get("/entry/c")).await.unwrap();
    let group = app.oneshot(get("/index/g")).await.unwrap();
    assert_eq!(a.status(), StatusCode::NOT_FOUND);
    assert_eq!(c.status(), StatusCode::OK);
    assert_eq!(group.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_all() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_entry("a", r#"{"content":"1","group":"g"}"#))
        .await
        .unwrap();
    app.clone()
        .oneshot(put_entry("b", r#"{"content":"2"}"#))
        .await
        .unwrap();

    let response = app.clone().oneshot(delete("/clear")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/index")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["all"], serde_json::json!([]));

    let response = app.oneshot(get("/entry/b")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Stats & Health Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_entry("k", r#"{"content":"v"}"#))
        .await
        .unwrap();
    app.clone().oneshot(get("/entry/k")).await.unwrap();
    app.clone().oneshot(get("/entry/nope")).await.unwrap();

    let response = app.oneshot(get("/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"].as_u64().unwrap(), 1);
    assert_eq!(json["misses"].as_u64().unwrap(), 1);
    assert_eq!(json["stores"].as_u64().unwrap(), 1);
    assert_eq!(json["total_keys"].as_u64().unwrap(), 1);
    assert_eq!(json["backend"].as_str().unwrap(), "memory");
    assert!((json["hit_rate"].as_f64().unwrap() - 0.5).abs() < 0.001);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"].as_str().unwrap(), "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Expiration via API Tests ==

#[tokio::test]
async fn test_expiration_via_api() {
    let app = create_test_app();

    let put_response = app
        .clone()
        .oneshot(put_entry("ttl_test", r#"{"content":"expires_soon","duration":"100 ms"}"#))
        .await
        .unwrap();
    assert_eq!(put_response.status(), StatusCode::OK);

    let get_response = app.clone().oneshot(get("/entry/ttl_test")).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(250)).await;

    let get_response = app.clone().oneshot(get("/entry/ttl_test")).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/index")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["all"], serde_json::json!([]));
}

#[tokio::test]
async fn test_filesystem_backend_header() {
    let dir = TempDir::new().unwrap();
    let backend = FsBackend::open(FsOptions::new(dir.path())).await.unwrap();
    let cache = Cache::new(Arc::new(backend), CacheOptions::default());
    let app = create_router(AppState::new(cache));

    app.clone()
        .oneshot(put_entry("page", r#"{"content":"<html/>"}"#))
        .await
        .unwrap();
    let response = app.oneshot(get("/entry/page")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[BACKEND_HEADER], "filesystem");
    assert_eq!(body_to_string(response.into_body()).await, "<html/>");
}
