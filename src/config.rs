//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::KvCacheConfig;
use crate::intercept::{ClassifyRules, InterceptConfig};
use crate::partition::PartitionLimits;
use crate::preload::PreloadConfig;

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Storefront origin every proxied request is forwarded to
    pub upstream_url: String,
    /// Version tag of the cache partitions
    pub cache_version: String,
    /// Directory backing the durable key-value store
    pub storage_dir: PathBuf,
    /// Maximum number of key-value cache entries
    pub kv_max_entries: usize,
    /// Key-value cache TTL in seconds
    pub snapshot_ttl_secs: u64,
    /// Network wait before API requests fall back to cache
    pub api_timeout_ms: u64,
    /// Freshness of static partition entries in seconds
    pub static_max_age_secs: u64,
    pub image_partition_max: usize,
    pub api_partition_max: usize,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
    /// Connectivity probe interval in seconds
    pub probe_interval: u64,
    /// Assets cached on install
    pub static_assets: Vec<String>,
    /// Images cached on activation
    pub critical_images: Vec<String>,
    /// Hosts whose requests are always API data
    pub api_hosts: Vec<String>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: Vec<String>) -> Vec<String> {
    match env::var(key) {
        Ok(v) => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Err(_) => default,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Storefront origin (default: http://localhost:8080)
    /// - `CACHE_VERSION` - Partition version tag (default: v1)
    /// - `STORAGE_DIR` - Durable store directory (default: .offline-cache)
    /// - `KV_MAX_ENTRIES` - Key-value cache capacity (default: 100)
    /// - `SNAPSHOT_TTL_SECS` - Key-value cache TTL (default: 1800)
    /// - `API_TIMEOUT_MS` - API network timeout (default: 5000)
    /// - `STATIC_MAX_AGE_SECS` - Static asset freshness (default: 604800)
    /// - `IMAGE_PARTITION_MAX` - Images partition capacity (default: 200)
    /// - `API_PARTITION_MAX` - API partition capacity (default: 100)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `PROBE_INTERVAL` - Connectivity probe frequency in seconds (default: 15)
    /// - `STATIC_ASSETS`, `CRITICAL_IMAGES`, `API_HOSTS` - comma separated lists
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            upstream_url: env_or("UPSTREAM_URL", defaults.upstream_url),
            cache_version: env_or("CACHE_VERSION", defaults.cache_version),
            storage_dir: env_or("STORAGE_DIR", defaults.storage_dir),
            kv_max_entries: env_or("KV_MAX_ENTRIES", defaults.kv_max_entries),
            snapshot_ttl_secs: env_or("SNAPSHOT_TTL_SECS", defaults.snapshot_ttl_secs),
            api_timeout_ms: env_or("API_TIMEOUT_MS", defaults.api_timeout_ms),
            static_max_age_secs: env_or("STATIC_MAX_AGE_SECS", defaults.static_max_age_secs),
            image_partition_max: env_or("IMAGE_PARTITION_MAX", defaults.image_partition_max),
            api_partition_max: env_or("API_PARTITION_MAX", defaults.api_partition_max),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            probe_interval: env_or("PROBE_INTERVAL", defaults.probe_interval),
            static_assets: env_list("STATIC_ASSETS", defaults.static_assets),
            critical_images: env_list("CRITICAL_IMAGES", defaults.critical_images),
            api_hosts: env_list("API_HOSTS", defaults.api_hosts),
        }
    }

    pub fn kv_cache(&self) -> KvCacheConfig {
        KvCacheConfig {
            ttl: Duration::from_secs(self.snapshot_ttl_secs),
            max_size: self.kv_max_entries,
        }
    }

    pub fn partition_limits(&self) -> PartitionLimits {
        PartitionLimits {
            images: Some(self.image_partition_max),
            api: Some(self.api_partition_max),
            ..PartitionLimits::default()
        }
    }

    pub fn intercept(&self) -> InterceptConfig {
        let defaults = InterceptConfig::default();
        InterceptConfig {
            origin: self.upstream_url.clone(),
            static_manifest: self.static_assets.clone(),
            critical_images: self.critical_images.clone(),
            api_timeout: Duration::from_millis(self.api_timeout_ms),
            static_max_age: Duration::from_secs(self.static_max_age_secs),
            rules: ClassifyRules {
                api_hosts: self.api_hosts.clone(),
                ..ClassifyRules::default()
            },
            ..defaults
        }
    }

    pub fn preload(&self) -> PreloadConfig {
        PreloadConfig::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upstream_url: "http://localhost:8080".to_string(),
            cache_version: "v1".to_string(),
            storage_dir: PathBuf::from(".offline-cache"),
            kv_max_entries: 100,
            snapshot_ttl_secs: 30 * 60,
            api_timeout_ms: 5000,
            static_max_age_secs: 7 * 24 * 60 * 60,
            image_partition_max: 200,
            api_partition_max: 100,
            cleanup_interval: 60,
            probe_interval: 15,
            static_assets: strings(&["/", "/manifest.json", "/favicon.ico", "/placeholder.svg"]),
            critical_images: strings(&["/images/hero.webp", "/images/logo.png"]),
            api_hosts: Vec::new(),
        }
    }
}
