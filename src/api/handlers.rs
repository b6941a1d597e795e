//! API Handlers
//!
//! HTTP handlers for the diagnostics endpoints and the proxy fallback that
//! feeds every other request through the interception layer.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::{header, StatusCode},
    Json,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{DurableStore, FileStore, KvCache, MemoryStore};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::intercept::{
    Connectivity, Destination, FetchRequest, FetchResponse, Fetcher, HttpFetcher, Interceptor,
    OfflineInterceptor,
};
use crate::models::{
    ConnectivityRequest, ConnectivityResponse, HealthResponse, PreloadAccepted, PreloadRequest,
    PushResponse, StatsResponse, SyncQuery, WindowQuery, WindowResponse,
};
use crate::offline::{CatalogSnapshot, ProductStore, RestCatalogSource, SyncOutcome};
use crate::partition::{CacheStorage, PartitionManager};
use crate::preload::{ImagePreloader, InterceptorImageLoader};

/// Largest request body forwarded upstream.
const MAX_PROXY_BODY: usize = 10 * 1024 * 1024;

/// Application state shared across all handlers.
///
/// The one long-lived context of the proxy: every component is built here
/// once and handed out by clone.
#[derive(Clone)]
pub struct AppState {
    pub interceptor: OfflineInterceptor,
    pub products: ProductStore,
    pub preloader: ImagePreloader,
    /// Key-value cache behind the product store
    pub cache: Arc<RwLock<KvCache>>,
    pub connectivity: Connectivity,
    pub fetcher: Arc<dyn Fetcher>,
}

impl AppState {
    /// Wires every component from `config` over the given network and
    /// durable store.
    pub fn new(config: &Config, fetcher: Arc<dyn Fetcher>, durable: Box<dyn DurableStore>) -> Self {
        let connectivity = Connectivity::default();
        let cache = Arc::new(RwLock::new(KvCache::new(config.kv_cache(), durable)));

        let partitions = PartitionManager::new(
            Arc::new(RwLock::new(CacheStorage::new())),
            config.cache_version.clone(),
            config.partition_limits(),
        );
        let interceptor = OfflineInterceptor::new(
            fetcher.clone(),
            partitions,
            connectivity.clone(),
            config.intercept(),
        );

        let source = RestCatalogSource::new(fetcher.clone(), config.upstream_url.clone());
        let products = ProductStore::new(cache.clone(), Arc::new(source), connectivity.clone());

        let loader = InterceptorImageLoader::new(interceptor.clone());
        let preloader = ImagePreloader::new(Arc::new(loader), config.preload());

        Self {
            interceptor,
            products,
            preloader,
            cache,
            connectivity,
            fetcher,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Uses the HTTP fetcher and a file store under `storage_dir`, falling
    /// back to memory-only storage if the directory is unusable.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new()?);
        let durable: Box<dyn DurableStore> = match FileStore::open(&config.storage_dir) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!(
                    dir = %config.storage_dir.display(),
                    error = %e,
                    "Durable storage unavailable, cache will not survive restarts"
                );
                Box::new(MemoryStore::new())
            }
        };
        Ok(Self::new(config, fetcher, durable))
    }
}

/// Handler for GET /__offline/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.connectivity.is_online(),
        state.interceptor.partitions().version(),
    ))
}

/// Handler for GET /__offline/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = state.products.stats().await;
    let cache = state.cache.read().await.stats();
    let partitions = state.interceptor.partitions().stats().await;

    Json(StatsResponse::new(
        store,
        cache,
        partitions,
        state.preloader.loaded_count(),
    ))
}

/// Handler for POST /__offline/sync
///
/// Failures are reported inside the outcome, so this always answers 200.
pub async fn sync_handler(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Json<SyncOutcome> {
    Json(state.products.sync(query.force).await)
}

/// Handler for GET /__offline/snapshot
pub async fn snapshot_handler(State(state): State<AppState>) -> Result<Json<CatalogSnapshot>> {
    state
        .products
        .get_snapshot()
        .await
        .map(Json)
        .ok_or_else(|| CacheError::NotFound("catalog snapshot".to_string()))
}

/// Handler for PUT /__offline/connectivity
pub async fn connectivity_handler(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    let changed = state.connectivity.set_online(req.online);
    Json(ConnectivityResponse {
        online: state.connectivity.is_online(),
        changed,
    })
}

/// Handler for POST /__offline/preload
///
/// Answers 202 right away; the batch runs in the background.
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Result<(StatusCode, Json<PreloadAccepted>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    if let Some(width) = req.viewport_width {
        state.preloader.set_viewport_width(width);
    }

    let accepted = req.items.len();
    let preloader = state.preloader.clone();
    tokio::spawn(async move {
        let report = preloader.batch_preload(req.items).await;
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Requested preload finished"
        );
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(PreloadAccepted {
            accepted,
            viewport_width: state.preloader.viewport_width(),
        }),
    ))
}

/// Handler for GET /__offline/window
pub async fn window_handler(Query(query): Query<WindowQuery>) -> Result<Json<WindowResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let bounds = query.params().compute(query.scroll_top, query.total);
    Ok(Json(bounds.into()))
}

/// Handler for POST /__offline/push
pub async fn push_handler(State(state): State<AppState>, body: Bytes) -> Json<PushResponse> {
    let notification = state.interceptor.on_push(&body);
    let click_route = state
        .interceptor
        .on_notification_click(&notification)
        .to_string();
    Json(PushResponse {
        notification,
        click_route,
    })
}

/// Fallback handler: every non-diagnostic request goes through the
/// interceptor and is answered with whatever it produces.
pub async fn proxy_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<FetchResponse> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, MAX_PROXY_BODY)
        .await
        .map_err(|e| CacheError::InvalidRequest(format!("Unreadable request body: {}", e)))?;

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!(
        "{}{}",
        state.interceptor.config().origin.trim_end_matches('/'),
        path
    );

    let destination = parts
        .headers
        .get("sec-fetch-dest")
        .and_then(|v| v.to_str().ok())
        .map(Destination::from_fetch_dest)
        .unwrap_or_default();

    let mut headers = parts.headers;
    headers.remove(header::HOST);

    debug!(method = %parts.method, url = %url, "Proxying request");
    let request = FetchRequest {
        method: parts.method,
        url,
        destination,
        headers,
        body,
    };
    Ok(state.interceptor.on_request(request).await)
}
