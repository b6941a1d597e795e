//! The interception layer: lifecycle events and per-request dispatch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use crate::intercept::classify::{ClassifyRules, ResourceClass};
use crate::intercept::notification::{Notification, NOTIFICATION_ROUTE};
use crate::intercept::{Connectivity, FetchRequest, FetchResponse, Fetcher};
use crate::partition::{PartitionKind, PartitionManager};

/// Platform-facing lifecycle of the caching layer.
///
/// A platform adapter (HTTP proxy, service-worker shim, ...) calls
/// `on_install` once, then `on_activate`, then `on_request` per request.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn on_install(&self) -> InstallReport;

    async fn on_activate(&self) -> ActivateReport;

    /// Always produces a response; failures become fallback responses.
    async fn on_request(&self, request: FetchRequest) -> FetchResponse;

    fn on_push(&self, payload: &[u8]) -> Notification {
        Notification::from_payload(payload)
    }

    /// Route to navigate to when a notification is clicked.
    fn on_notification_click(&self, _notification: &Notification) -> &'static str {
        NOTIFICATION_ROUTE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub deleted_partitions: Vec<String>,
    pub preloaded: Vec<String>,
    pub failed: Vec<String>,
}

/// Result of one background revalidation, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Refreshed { url: String, partition: PartitionKind },
    Failed { url: String, reason: String },
}

// == Config ==
#[derive(Debug, Clone)]
pub struct InterceptConfig {
    /// Origin that relative manifest paths resolve against
    pub origin: String,
    /// Critical assets cached into the static partition on install
    pub static_manifest: Vec<String>,
    /// Images cached into the products partition on activation
    pub critical_images: Vec<String>,
    /// Static asset served when an image cannot be loaded
    pub placeholder: String,
    pub api_timeout: Duration,
    /// Freshness of static partition entries
    pub static_max_age: Duration,
    pub rules: ClassifyRules,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            static_manifest: vec![
                "/".to_string(),
                "/manifest.json".to_string(),
                "/favicon.ico".to_string(),
                "/placeholder.svg".to_string(),
            ],
            critical_images: vec![
                "/images/hero.webp".to_string(),
                "/images/logo.png".to_string(),
            ],
            placeholder: "/placeholder.svg".to_string(),
            api_timeout: Duration::from_secs(5),
            static_max_age: Duration::from_secs(7 * 24 * 60 * 60),
            rules: ClassifyRules::default(),
        }
    }
}

impl InterceptConfig {
    /// Absolute URL for a manifest path.
    pub fn resolve(&self, path: &str) -> String {
        if Url::parse(path).is_ok() {
            return path.to_string();
        }
        Url::parse(&self.origin)
            .and_then(|origin| origin.join(path))
            .map(String::from)
            .unwrap_or_else(|_| format!("{}{}", self.origin.trim_end_matches('/'), path))
    }
}

const REFRESH_CHANNEL_CAPACITY: usize = 64;

// == Offline Interceptor ==
/// Caching interceptor; clones share partitions, network and channels.
#[derive(Clone)]
pub struct OfflineInterceptor {
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) partitions: PartitionManager,
    pub(crate) connectivity: Connectivity,
    pub(crate) config: Arc<InterceptConfig>,
    pub(crate) refresh_tx: broadcast::Sender<RefreshOutcome>,
}

impl OfflineInterceptor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        partitions: PartitionManager,
        connectivity: Connectivity,
        config: InterceptConfig,
    ) -> Self {
        let (refresh_tx, _) = broadcast::channel(REFRESH_CHANNEL_CAPACITY);
        Self {
            fetcher,
            partitions,
            connectivity,
            config: Arc::new(config),
            refresh_tx,
        }
    }

    pub fn partitions(&self) -> &PartitionManager {
        &self.partitions
    }

    pub fn config(&self) -> &InterceptConfig {
        &self.config
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Stream of background revalidation outcomes.
    pub fn subscribe_refreshes(&self) -> broadcast::Receiver<RefreshOutcome> {
        self.refresh_tx.subscribe()
    }

    pub fn classify(&self, request: &FetchRequest) -> ResourceClass {
        self.config.rules.classify(request)
    }
}

#[async_trait]
impl Interceptor for OfflineInterceptor {
    async fn on_install(&self) -> InstallReport {
        self.partitions.create_all().await;

        let mut report = InstallReport::default();
        for path in &self.config.static_manifest {
            let url = self.config.resolve(path);
            match self.fetcher.fetch(&FetchRequest::get(&url)).await {
                Ok(response) if response.is_success() => {
                    self.partitions
                        .put(PartitionKind::Static, &url, response)
                        .await;
                    report.cached.push(url);
                }
                Ok(response) => {
                    warn!(url = %url, status = %response.status, "Install: asset not cached");
                    report.failed.push(url);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Install: asset not cached");
                    report.failed.push(url);
                }
            }
        }

        info!(
            cached = report.cached.len(),
            failed = report.failed.len(),
            version = %self.partitions.version(),
            "Install complete"
        );
        report
    }

    async fn on_activate(&self) -> ActivateReport {
        let mut report = ActivateReport {
            deleted_partitions: self.partitions.activate().await,
            ..ActivateReport::default()
        };

        for path in &self.config.critical_images {
            let url = self.config.resolve(path);
            match self.fetcher.fetch(&FetchRequest::image(&url)).await {
                Ok(response) if response.is_success() => {
                    self.partitions
                        .put(PartitionKind::Products, &url, response)
                        .await;
                    report.preloaded.push(url);
                }
                Ok(response) => {
                    warn!(url = %url, status = %response.status, "Critical image preload skipped");
                    report.failed.push(url);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Critical image preload skipped");
                    report.failed.push(url);
                }
            }
        }

        info!(
            deleted = report.deleted_partitions.len(),
            preloaded = report.preloaded.len(),
            "Activation complete"
        );
        report
    }

    async fn on_request(&self, request: FetchRequest) -> FetchResponse {
        if !request.is_cacheable() {
            return self.passthrough(request).await;
        }

        let class = self.classify(&request);
        debug!(url = %request.url, ?class, "Intercepted request");

        match class {
            ResourceClass::Document => self.network_first_document(request).await,
            ResourceClass::Image => self.cache_first_image(request).await,
            ResourceClass::Api => self.network_first_data(PartitionKind::Api, request).await,
            ResourceClass::Product => self.cache_first_product(request).await,
            ResourceClass::Static => self.cache_first_static(request).await,
        }
    }
}
