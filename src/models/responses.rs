//! Response DTOs for the diagnostics API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::intercept::Notification;
use crate::offline::{StoreState, StoreStats};
use crate::partition::PartitionStats;
use crate::window::WindowBounds;

/// Response body for the stats endpoint (GET /__offline/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Products in the last known snapshot
    pub item_count: usize,
    pub online: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub store_state: StoreState,
    /// Number of key-value cache hits
    pub hits: u64,
    /// Number of key-value cache misses
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Current number of in-memory key-value entries
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub partitions: Vec<PartitionStats>,
    pub preloaded_images: usize,
}

impl StatsResponse {
    pub fn new(
        store: StoreStats,
        cache: CacheStats,
        partitions: Vec<PartitionStats>,
        preloaded_images: usize,
    ) -> Self {
        Self {
            item_count: store.item_count,
            online: store.online,
            last_sync: store.last_sync,
            store_state: store.state,
            hits: cache.hits,
            misses: cache.misses,
            evictions: cache.evictions,
            expirations: cache.expirations,
            total_entries: cache.total_entries,
            hit_rate: cache.hit_rate(),
            partitions,
            preloaded_images,
        }
    }
}

/// Response body for the health endpoint (GET /__offline/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub online: bool,
    pub cache_version: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(online: bool, cache_version: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            online,
            cache_version: cache_version.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityResponse {
    pub online: bool,
    /// False when the flag already had the requested value
    pub changed: bool,
}

/// Response body for `POST /__offline/preload` (202 Accepted)
#[derive(Debug, Clone, Serialize)]
pub struct PreloadAccepted {
    pub accepted: usize,
    pub viewport_width: u32,
}

/// Response body for the window endpoint (GET /__offline/window)
#[derive(Debug, Clone, Serialize)]
pub struct WindowResponse {
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub visible_count: usize,
    pub total_height: f64,
    pub should_load_more: bool,
}

impl From<WindowBounds> for WindowResponse {
    fn from(bounds: WindowBounds) -> Self {
        Self {
            start_index: bounds.start_index(),
            end_index: bounds.end_index(),
            visible_count: bounds.len(),
            total_height: bounds.total_height,
            should_load_more: bounds.should_load_more,
        }
    }
}

/// Response body for `POST /__offline/push`
#[derive(Debug, Clone, Serialize)]
pub struct PushResponse {
    pub notification: Notification,
    /// Route a click on the notification opens
    pub click_route: String,
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
