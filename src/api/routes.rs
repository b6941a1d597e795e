//! API Routes
//!
//! Configures the Axum router: diagnostics under `/__offline`, everything
//! else proxied through the interceptor.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    connectivity_handler, health_handler, preload_handler, proxy_handler, push_handler,
    snapshot_handler, stats_handler, sync_handler, window_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /__offline/health` - Health check endpoint
/// - `GET /__offline/stats` - Cache, partition and catalog statistics
/// - `POST /__offline/sync?force=bool` - Catalog sync
/// - `GET /__offline/snapshot` - Cached catalog snapshot
/// - `PUT /__offline/connectivity` - Override the online flag
/// - `POST /__offline/preload` - Queue image preloads
/// - `GET /__offline/window` - Virtual window computation
/// - `POST /__offline/push` - Turn a push payload into a notification
/// - anything else - proxied through the interceptor
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/__offline/health", get(health_handler))
        .route("/__offline/stats", get(stats_handler))
        .route("/__offline/sync", post(sync_handler))
        .route("/__offline/snapshot", get(snapshot_handler))
        .route("/__offline/connectivity", put(connectivity_handler))
        .route("/__offline/preload", post(preload_handler))
        .route("/__offline/window", get(window_handler))
        .route("/__offline/push", post(push_handler))
        .fallback(proxy_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::config::Config;
    use crate::intercept::mock::MockFetcher;
    use crate::intercept::FetchResponse;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<MockFetcher>) {
        let fetcher = Arc::new(MockFetcher::new());
        let config = Config {
            upstream_url: "http://shop.test".to_string(),
            ..Config::default()
        };
        let state = AppState::new(&config, fetcher.clone(), Box::new(MemoryStore::new()));
        (create_router(state), fetcher)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/__offline/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_snapshot_not_found() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/__offline/snapshot")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_window_rejects_bad_height() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/__offline/window?item_height=0&container_height=900&total=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_path_is_proxied() {
        let (app, fetcher) = create_test_app();
        fetcher.respond("http://shop.test/app.js", FetchResponse::ok("console.log(1)"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/app.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fetcher.calls("http://shop.test/app.js"), 1);
    }

    #[tokio::test]
    async fn test_preload_accepted() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/__offline/preload")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"items":[{"src":"/a.jpg","priority":"high"}]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
