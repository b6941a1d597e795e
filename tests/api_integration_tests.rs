//! Integration Tests for the Offline Proxy
//!
//! Drives the full router against a scripted upstream, online and offline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use storefront_offline::{
    api::create_router,
    cache::MemoryStore,
    intercept::{FetchRequest, FetchResponse, Fetcher, Interceptor, SERVED_FROM_HEADER},
    AppState, Config, FetchError,
};
use tower::ServiceExt;

const UPSTREAM: &str = "http://shop.test";

// == Helper Functions ==

#[derive(Default)]
struct ScriptedUpstream {
    routes: Mutex<HashMap<String, FetchResponse>>,
    down: AtomicBool,
}

impl ScriptedUpstream {
    fn serve(&self, path: &str, response: FetchResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{}{}", UPSTREAM, path), response);
    }

    fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for ScriptedUpstream {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(FetchError::Network("connection refused".to_string()));
        }
        let routed = self.routes.lock().unwrap().get(&request.url).cloned();
        Ok(routed.unwrap_or_else(FetchResponse::not_found))
    }
}

fn create_test_app() -> (Router, AppState, Arc<ScriptedUpstream>) {
    let upstream = Arc::new(ScriptedUpstream::default());
    let config = Config {
        upstream_url: UPSTREAM.to_string(),
        ..Config::default()
    };
    let state = AppState::new(&config, upstream.clone(), Box::new(MemoryStore::new()));
    (create_router(state.clone()), state, upstream)
}

fn serve_catalog(upstream: &ScriptedUpstream) {
    upstream.serve(
        "/rest/v1/products?select=*",
        FetchResponse::ok(
            r#"[{"id":"p1","name":"Sneaker","price":59.0,"category_id":"c1"},
                {"id":"p2","name":"Boot","price":89.0,"category_id":"c1"}]"#,
        ),
    );
    upstream.serve(
        "/rest/v1/categories?select=*",
        FetchResponse::ok(r#"[{"id":"c1","name":"Shoes","slug":"shoes"}]"#),
    );
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_to_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_to_bytes(body).await).unwrap()
}

// == Document Strategy ==

#[tokio::test]
async fn test_document_offline_without_cache_gets_offline_page() {
    let (app, _, upstream) = create_test_app();
    upstream.go_down();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/products/sneaker")
                .header("accept", "text/html,application/xhtml+xml")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = String::from_utf8(body_to_bytes(response.into_body()).await).unwrap();
    assert!(body.contains("You are offline"));
    assert!(body.contains("Retry"));
}

#[tokio::test]
async fn test_document_offline_served_from_install_cache() {
    let (app, state, upstream) = create_test_app();
    upstream.serve("/", FetchResponse::ok("<html>home</html>"));
    state.interceptor.on_install().await;
    upstream.go_down();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("sec-fetch-dest", "document")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_bytes(response.into_body()).await, b"<html>home</html>");
}

// == API Strategy ==

#[tokio::test]
async fn test_api_offline_without_cache_gets_structured_503() {
    let (app, _, upstream) = create_test_app();
    upstream.go_down();

    let response = app.oneshot(get("/api/cart")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["offline"], true);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_api_falls_back_to_cached_copy() {
    let (app, _, upstream) = create_test_app();
    upstream.serve("/api/cart", FetchResponse::ok(r#"{"items":2}"#));

    let online = app.clone().oneshot(get("/api/cart")).await.unwrap();
    assert_eq!(online.status(), StatusCode::OK);
    assert!(online.headers().get(SERVED_FROM_HEADER).is_none());

    upstream.go_down();
    let offline = app.oneshot(get("/api/cart")).await.unwrap();

    assert_eq!(offline.status(), StatusCode::OK);
    assert_eq!(
        offline
            .headers()
            .get(SERVED_FROM_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("cache")
    );
    assert_eq!(body_to_json(offline.into_body()).await["items"], 2);
}

#[tokio::test]
async fn test_non_get_offline_is_not_cached() {
    let (app, _, upstream) = create_test_app();
    upstream.go_down();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/cart")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"product":"p1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_to_json(response.into_body()).await["offline"], true);
}

// == Catalog Sync ==

#[tokio::test]
async fn test_sync_then_stats_and_snapshot() {
    let (app, _, upstream) = create_test_app();
    serve_catalog(&upstream);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/__offline/sync")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_to_json(response.into_body()).await;
    assert_eq!(outcome["source"], "network");
    assert!(outcome["error"].is_null());

    let stats = body_to_json(
        app.clone()
            .oneshot(get("/__offline/stats"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(stats["item_count"], 2);
    assert_eq!(stats["online"], true);
    assert_eq!(stats["store_state"], "synced");
    assert!(stats["partitions"].is_array());

    let snapshot = app.oneshot(get("/__offline/snapshot")).await.unwrap();
    assert_eq!(snapshot.status(), StatusCode::OK);
    let snapshot = body_to_json(snapshot.into_body()).await;
    assert_eq!(snapshot["schemaVersion"], 1);
    assert_eq!(snapshot["categories"][0]["slug"], "shoes");
}

#[tokio::test]
async fn test_forced_sync_failure_reports_error_and_keeps_snapshot() {
    let (app, state, upstream) = create_test_app();
    serve_catalog(&upstream);
    state.products.sync(false).await;
    upstream.go_down();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/__offline/sync?force=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let outcome = body_to_json(response.into_body()).await;
    assert_eq!(outcome["source"], "fallback");
    assert!(outcome["error"].as_str().unwrap().contains("connection refused"));
    assert_eq!(outcome["snapshot"]["products"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_offline_sync_never_hits_network() {
    let (app, state, upstream) = create_test_app();
    serve_catalog(&upstream);
    state.connectivity.set_online(false);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/__offline/sync")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let outcome = body_to_json(response.into_body()).await;
    assert_eq!(outcome["source"], "offline");
    assert!(outcome["snapshot"].is_null());
}

// == Connectivity ==

#[tokio::test]
async fn test_connectivity_override_shows_in_health() {
    let (app, _, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/__offline/connectivity")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"online":false}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await["changed"], true);

    let health = body_to_json(
        app.oneshot(get("/__offline/health"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["online"], false);
}

#[tokio::test]
async fn test_invalid_json_request() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/__offline/connectivity")
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Window ==

#[tokio::test]
async fn test_window_endpoint() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(get(
            "/__offline/window?scroll_top=3000&item_height=300&container_height=900&overscan=1&total=100",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["start_index"], 9);
    assert_eq!(json["end_index"], 14);
    assert_eq!(json["should_load_more"], false);
}

#[tokio::test]
async fn test_window_endpoint_empty_list() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(get(
            "/__offline/window?item_height=300&container_height=900&total=0",
        ))
        .await
        .unwrap();

    let json = body_to_json(response.into_body()).await;
    assert!(json["start_index"].is_null());
    assert_eq!(json["visible_count"], 0);
}

// == Preload ==

#[tokio::test]
async fn test_preload_warms_images_partition() {
    let (app, state, upstream) = create_test_app();
    upstream.serve(
        "/images/shoe.jpg?width=1920&quality=75&format=webp",
        FetchResponse::ok("jpeg"),
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/__offline/preload")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"items":[{"src":"/images/shoe.jpg","priority":"high"}]}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // The batch runs in the background.
    for _ in 0..50 {
        if state.preloader.loaded_count() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(state.preloader.is_loaded("/images/shoe.jpg"));
}
