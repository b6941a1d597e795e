//! Storefront Offline - offline caching layer for a storefront
//!
//! Provides a TTL key-value cache with durable mirroring, versioned response
//! partitions, per-resource caching strategies, image preloading, a virtual
//! window calculator and an offline catalog store, exposed as an HTTP proxy.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod intercept;
pub mod models;
pub mod offline;
pub mod partition;
pub mod preload;
pub mod tasks;
pub mod window;

pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, FetchError};
pub use intercept::{Interceptor, OfflineInterceptor};
pub use offline::ProductStore;
pub use tasks::spawn_cleanup_task;
