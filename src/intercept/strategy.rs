//! Caching strategies, one per resource class.
//!
//! | Class    | Strategy                                           |
//! |----------|----------------------------------------------------|
//! | Document | network-first, no caching, offline page fallback   |
//! | Image    | cache-first, background revalidation, placeholder  |
//! | Api      | network-first with timeout, cached fallback        |
//! | Product  | cache-first, refresh only when online              |
//! | Static   | cache-first, stale copy on network failure         |

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::intercept::fallback::{offline_json, offline_page};
use crate::intercept::interceptor::{OfflineInterceptor, RefreshOutcome};
use crate::intercept::{FetchRequest, FetchResponse};
use crate::partition::PartitionKind;

impl OfflineInterceptor {
    /// Always-fresh HTML: bypasses HTTP caches and never stores the result.
    pub(crate) async fn network_first_document(&self, request: FetchRequest) -> FetchResponse {
        let busted = request
            .clone()
            .with_header("cache-control", "no-cache, no-store, must-revalidate")
            .with_header("pragma", "no-cache");

        match self.fetcher.fetch(&busted).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Document fetch failed; trying cache");
                match self
                    .partitions
                    .lookup(PartitionKind::Static, &request.url)
                    .await
                {
                    Some(cached) => cached,
                    None => offline_page(),
                }
            }
        }
    }

    /// Cached copy of an image from the images partition or, for critical
    /// images stored on activation, the products partition.
    async fn lookup_image(&self, url: &str) -> Option<(PartitionKind, FetchResponse)> {
        for kind in [PartitionKind::Images, PartitionKind::Products] {
            if let Some(cached) = self.partitions.lookup(kind, url).await {
                return Some((kind, cached));
            }
        }
        None
    }

    pub(crate) async fn cache_first_image(&self, request: FetchRequest) -> FetchResponse {
        if let Some((kind, cached)) = self.lookup_image(&request.url).await {
            debug!(url = %request.url, ?kind, "Image served from cache; revalidating");
            self.revalidate(kind, request);
            return cached;
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_success() {
                    self.partitions
                        .put(PartitionKind::Images, &request.url, response.clone())
                        .await;
                }
                response
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Image fetch failed; using placeholder");
                let placeholder = self.config.resolve(&self.config.placeholder);
                self.partitions
                    .lookup(PartitionKind::Static, &placeholder)
                    .await
                    .unwrap_or_else(FetchResponse::not_found)
            }
        }
    }

    /// Network with a bounded wait; on failure the cached copy of `kind`,
    /// marked as served from cache, or a structured 503.
    pub(crate) async fn network_first_data(
        &self,
        kind: PartitionKind,
        request: FetchRequest,
    ) -> FetchResponse {
        let timeout = self.config.api_timeout;
        let result = match tokio::time::timeout(timeout, self.fetcher.fetch(&request)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };

        match result {
            Ok(response) => {
                if response.is_success() {
                    self.partitions
                        .put(kind, &request.url, response.clone())
                        .await;
                }
                response
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Data fetch failed; trying cache");
                match self.partitions.lookup(kind, &request.url).await {
                    Some(cached) => cached.served_from_cache(),
                    None => offline_json("Network unavailable and no cached data"),
                }
            }
        }
    }

    pub(crate) async fn cache_first_product(&self, request: FetchRequest) -> FetchResponse {
        if let Some(cached) = self
            .partitions
            .lookup(PartitionKind::Products, &request.url)
            .await
        {
            if self.connectivity.is_online() {
                self.revalidate(PartitionKind::Products, request);
            }
            return cached;
        }
        self.network_first_data(PartitionKind::Products, request)
            .await
    }

    pub(crate) async fn cache_first_static(&self, request: FetchRequest) -> FetchResponse {
        if let Some(fresh) = self
            .partitions
            .lookup_fresh(PartitionKind::Static, &request.url, self.config.static_max_age)
            .await
        {
            return fresh;
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_success() {
                    self.partitions
                        .put(PartitionKind::Static, &request.url, response.clone())
                        .await;
                }
                response
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Static fetch failed; trying stale copy");
                self.partitions
                    .lookup(PartitionKind::Static, &request.url)
                    .await
                    .unwrap_or_else(FetchResponse::not_found)
            }
        }
    }

    /// Makes sure `url` is in the images partition without any fallback
    /// response. Used by the preloader, which must see real failures.
    pub async fn warm_image(&self, url: &str) -> Result<(), FetchError> {
        if self.lookup_image(url).await.is_some() {
            return Ok(());
        }

        let response = self.fetcher.fetch(&FetchRequest::image(url)).await?;
        if !response.is_success() {
            return Err(FetchError::Network(format!(
                "{} answered {}",
                url, response.status
            )));
        }
        self.partitions
            .put(PartitionKind::Images, url, response)
            .await;
        Ok(())
    }

    /// Non-GET requests skip every cache.
    pub(crate) async fn passthrough(&self, request: FetchRequest) -> FetchResponse {
        match self.fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %request.method, url = %request.url, error = %e, "Request failed");
                offline_json("Network unavailable")
            }
        }
    }

    /// Re-fetches `request` in a spawned task and stores a successful
    /// response in `kind`, re-inserting it even if it was evicted meanwhile.
    ///
    /// The outcome goes to the returned handle and to every
    /// `subscribe_refreshes` receiver.
    pub fn revalidate(&self, kind: PartitionKind, request: FetchRequest) -> JoinHandle<RefreshOutcome> {
        let fetcher = self.fetcher.clone();
        let partitions = self.partitions.clone();
        let refresh_tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            let url = request.url.clone();
            let outcome = match fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    partitions.put(kind, &url, response).await;
                    debug!(url = %url, "Background refresh stored");
                    RefreshOutcome::Refreshed { url, partition: kind }
                }
                Ok(response) => {
                    warn!(url = %url, status = %response.status, "Background refresh rejected");
                    RefreshOutcome::Failed {
                        url,
                        reason: format!("status {}", response.status),
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Background refresh failed");
                    RefreshOutcome::Failed {
                        url,
                        reason: e.to_string(),
                    }
                }
            };
            // No subscribers is fine.
            let _ = refresh_tx.send(outcome.clone());
            outcome
        })
    }
}
