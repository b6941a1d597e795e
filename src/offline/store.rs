//! Offline Product Store
//!
//! Keeps one catalog snapshot in the persistent key-value cache and decides
//! when a sync may touch the network.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::KvCache;
use crate::error::FetchError;
use crate::intercept::Connectivity;
use crate::offline::{CatalogSnapshot, CatalogSource};

/// Cache key of the catalog snapshot.
pub const SNAPSHOT_KEY: &str = "offline_products";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    /// Nothing synced yet
    Empty,
    /// Cached snapshot within its TTL
    Synced,
    /// Only an expired snapshot is known
    Stale,
}

/// Where the snapshot returned by a sync came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    /// Unexpired cached snapshot, no network
    Cache,
    /// Device offline, last known snapshot (possibly stale or none)
    Offline,
    /// Freshly fetched and stored
    Network,
    /// Refresh failed, last known snapshot served instead
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub snapshot: Option<CatalogSnapshot>,
    pub source: SyncSource,
    /// Set only when a refresh was attempted and failed
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn is_fresh(&self) -> bool {
        self.source == SyncSource::Network
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub item_count: usize,
    pub category_count: usize,
    pub online: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub state: StoreState,
}

// == Product Store ==
#[derive(Clone)]
pub struct ProductStore {
    cache: Arc<RwLock<KvCache>>,
    source: Arc<dyn CatalogSource>,
    connectivity: Connectivity,
    /// Survives the cache TTL so an expired catalog can still be served
    last_good: Arc<RwLock<Option<CatalogSnapshot>>>,
}

impl ProductStore {
    pub fn new(
        cache: Arc<RwLock<KvCache>>,
        source: Arc<dyn CatalogSource>,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            cache,
            source,
            connectivity,
            last_good: Arc::new(RwLock::new(None)),
        }
    }

    /// Cached snapshot, or `None` if absent, expired or of an unknown schema.
    /// Never touches the network.
    pub async fn get_snapshot(&self) -> Option<CatalogSnapshot> {
        let cached = {
            let mut cache = self.cache.write().await;
            self.seed_last_good(&mut cache).await;
            cache.get::<CatalogSnapshot>(SNAPSHOT_KEY)?
        };

        if !cached.is_current_schema() {
            warn!(
                schema_version = cached.schema_version,
                "Ignoring cached catalog with unknown schema version"
            );
            return None;
        }

        let mut last_good = self.last_good.write().await;
        if last_good.as_ref().map(|s| s.last_sync) != Some(cached.last_sync) {
            *last_good = Some(cached.clone());
        }
        Some(cached)
    }

    // == Sync ==
    /// Brings the catalog up to date where allowed.
    ///
    /// Without `force`, an unexpired snapshot is returned as is, and an
    /// offline device never attempts the network. Fetch failures are
    /// reported in the outcome instead of being returned as errors.
    pub async fn sync(&self, force: bool) -> SyncOutcome {
        if !force {
            if let Some(snapshot) = self.get_snapshot().await {
                debug!(items = snapshot.item_count(), "Catalog served from cache");
                return SyncOutcome {
                    snapshot: Some(snapshot),
                    source: SyncSource::Cache,
                    error: None,
                };
            }

            if !self.connectivity.is_online() {
                debug!("Offline, skipping catalog sync");
                return SyncOutcome {
                    snapshot: self.last_good().await,
                    source: SyncSource::Offline,
                    error: None,
                };
            }
        }

        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                self.cache.write().await.set(SNAPSHOT_KEY, &snapshot);
                *self.last_good.write().await = Some(snapshot.clone());
                info!(
                    products = snapshot.products.len(),
                    categories = snapshot.categories.len(),
                    "Catalog synced"
                );
                SyncOutcome {
                    snapshot: Some(snapshot),
                    source: SyncSource::Network,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Catalog sync failed, serving last known snapshot");
                let snapshot = match self.get_snapshot().await {
                    Some(snapshot) => Some(snapshot),
                    None => self.last_good().await,
                };
                SyncOutcome {
                    snapshot,
                    source: SyncSource::Fallback,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn state(&self) -> StoreState {
        if self.get_snapshot().await.is_some() {
            StoreState::Synced
        } else if self.last_good.read().await.is_some() {
            StoreState::Stale
        } else {
            StoreState::Empty
        }
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.state().await;
        let last_good = self.last_good.read().await;

        StoreStats {
            item_count: last_good.as_ref().map(|s| s.item_count()).unwrap_or(0),
            category_count: last_good.as_ref().map(|s| s.categories.len()).unwrap_or(0),
            online: self.connectivity.is_online(),
            last_sync: last_good.as_ref().map(|s| s.last_sync),
            state,
        }
    }

    /// Adopts whatever snapshot the cache holds, expired or not, before a
    /// read can purge it. Only the first call after startup finds anything
    /// to do.
    async fn seed_last_good(&self, cache: &mut KvCache) {
        let mut last_good = self.last_good.write().await;
        if last_good.is_some() {
            return;
        }
        *last_good = cache
            .peek_stale::<CatalogSnapshot>(SNAPSHOT_KEY)
            .filter(CatalogSnapshot::is_current_schema);
        if let Some(snapshot) = last_good.as_ref() {
            debug!(last_sync = %snapshot.last_sync, "Recovered catalog from durable storage");
        }
    }

    async fn last_good(&self) -> Option<CatalogSnapshot> {
        self.last_good.read().await.clone()
    }

    async fn fetch_snapshot(&self) -> Result<CatalogSnapshot, FetchError> {
        let (products, categories) =
            tokio::try_join!(self.source.fetch_products(), self.source.fetch_categories())?;
        Ok(CatalogSnapshot::new(products, categories))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KvCacheConfig;
    use crate::offline::{CategorySummary, ProductSummary, SNAPSHOT_SCHEMA_VERSION};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl CountingSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CatalogSource for CountingSource {
        async fn fetch_products(&self) -> Result<Vec<ProductSummary>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Network("connection reset".into()));
            }
            Ok(vec![ProductSummary {
                id: format!("p{}", n),
                name: "Sneaker".into(),
                price: 59.5,
                sale_price: Some(49.5),
                image_url: Some("/images/sneaker.webp".into()),
                category_id: Some("c1".into()),
                variants: vec![],
            }])
        }

        async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, FetchError> {
            Ok(vec![CategorySummary {
                id: "c1".into(),
                name: "Shoes".into(),
                slug: Some("shoes".into()),
                image_url: None,
            }])
        }
    }

    fn store_with(ttl: Duration, online: bool) -> (ProductStore, Arc<CountingSource>) {
        let cache = KvCache::in_memory(KvCacheConfig { ttl, max_size: 10 });
        let source = Arc::new(CountingSource::default());
        let store = ProductStore::new(
            Arc::new(RwLock::new(cache)),
            source.clone(),
            Connectivity::new(online),
        );
        (store, source)
    }

    #[tokio::test]
    async fn test_sync_is_idempotent_within_ttl() {
        let (store, source) = store_with(Duration::from_secs(60), true);

        let first = store.sync(false).await;
        let second = store.sync(false).await;

        assert_eq!(source.calls(), 1);
        assert_eq!(first.source, SyncSource::Network);
        assert_eq!(second.source, SyncSource::Cache);
        assert_eq!(first.snapshot, second.snapshot);
    }

    #[tokio::test]
    async fn test_offline_never_touches_network() {
        let (store, source) = store_with(Duration::from_secs(60), false);

        let outcome = store.sync(false).await;

        assert_eq!(source.calls(), 0);
        assert_eq!(outcome.source, SyncSource::Offline);
        assert!(outcome.snapshot.is_none());
        assert!(outcome.error.is_none());
        assert_eq!(store.state().await, StoreState::Empty);
    }

    #[tokio::test]
    async fn test_offline_serves_stale_snapshot() {
        let (store, source) = store_with(Duration::from_millis(30), true);
        store.sync(false).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        store.connectivity.set_online(false);
        let outcome = store.sync(false).await;

        assert_eq!(source.calls(), 1);
        assert_eq!(outcome.source, SyncSource::Offline);
        assert_eq!(outcome.snapshot.map(|s| s.item_count()), Some(1));
        assert!(store.get_snapshot().await.is_none());
        assert_eq!(store.state().await, StoreState::Stale);
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_with_error() {
        let (store, source) = store_with(Duration::from_secs(60), true);
        let synced = store.sync(false).await.snapshot;

        source.fail(true);
        let outcome = store.sync(true).await;

        assert_eq!(outcome.source, SyncSource::Fallback);
        assert!(!outcome.is_fresh());
        assert!(outcome.error.unwrap().contains("connection reset"));
        assert_eq!(outcome.snapshot, synced);
    }

    #[tokio::test]
    async fn test_failed_first_sync_reports_nothing() {
        let (store, source) = store_with(Duration::from_secs(60), true);
        source.fail(true);

        let outcome = store.sync(false).await;
        assert!(outcome.snapshot.is_none());
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_forced_sync_replaces_snapshot() {
        let (store, source) = store_with(Duration::from_secs(60), true);
        store.sync(false).await;

        let outcome = store.sync(true).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(outcome.source, SyncSource::Network);
        let current = store.get_snapshot().await.unwrap();
        assert_eq!(current.products[0].id, "p1");
        assert_eq!(current.item_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_schema_treated_as_absent() {
        let (store, _) = store_with(Duration::from_secs(60), true);
        let mut future = CatalogSnapshot::new(vec![], vec![]);
        future.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
        store.cache.write().await.set(SNAPSHOT_KEY, &future);

        assert!(store.get_snapshot().await.is_none());
        assert_eq!(store.state().await, StoreState::Empty);
    }

    fn session_over(
        dir: &std::path::Path,
        ttl: Duration,
        online: bool,
    ) -> (ProductStore, Arc<CountingSource>) {
        let durable = crate::cache::FileStore::open(dir).unwrap();
        let cache = KvCache::new(KvCacheConfig { ttl, max_size: 10 }, Box::new(durable));
        let source = Arc::new(CountingSource::default());
        let store = ProductStore::new(
            Arc::new(RwLock::new(cache)),
            source.clone(),
            Connectivity::new(online),
        );
        (store, source)
    }

    #[tokio::test]
    async fn test_offline_after_restart_serves_expired_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (first, _) = session_over(dir.path(), Duration::from_millis(30), true);
        assert_eq!(first.sync(false).await.source, SyncSource::Network);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (restarted, source) = session_over(dir.path(), Duration::from_millis(30), false);
        let outcome = restarted.sync(false).await;

        assert_eq!(source.calls(), 0);
        assert_eq!(outcome.source, SyncSource::Offline);
        assert_eq!(outcome.snapshot.map(|s| s.products[0].id.clone()), Some("p0".to_string()));
        assert_eq!(restarted.state().await, StoreState::Stale);
    }

    #[tokio::test]
    async fn test_stats_reflect_snapshot() {
        let (store, _) = store_with(Duration::from_secs(60), true);
        assert_eq!(store.stats().await.item_count, 0);

        store.sync(false).await;
        let stats = store.stats().await;

        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.category_count, 1);
        assert!(stats.online);
        assert!(stats.last_sync.is_some());
        assert_eq!(stats.state, StoreState::Synced);
    }
}
