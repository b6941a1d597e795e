//! TTL Sweep Task
//!
//! Background task that periodically reclaims expired key-value entries.
//! Reads already ignore expired entries; this only frees the space.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::KvCache;

/// Spawns a background task that sweeps expired cache entries.
///
/// Returns the task handle so the caller can abort it on shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(KvCache::in_memory(KvCacheConfig::default())));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<RwLock<KvCache>>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    spawn_cleanup_every(cache, Duration::from_secs(cleanup_interval_secs))
}

pub(crate) fn spawn_cleanup_every(cache: Arc<RwLock<KvCache>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = ?interval, "Starting TTL sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.write().await.sweep_expired();

            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KvCacheConfig;

    fn shared_cache(ttl: Duration) -> Arc<RwLock<KvCache>> {
        Arc::new(RwLock::new(KvCache::in_memory(KvCacheConfig {
            ttl,
            max_size: 100,
        })))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = shared_cache(Duration::from_millis(20));
        cache.write().await.set("expire_soon", &"value");

        let handle = spawn_cleanup_every(cache.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.read().await.len(), 0, "Expired entry should have been swept");
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = shared_cache(Duration::from_secs(3600));
        cache.write().await.set("long_lived", &"value");

        let handle = spawn_cleanup_every(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(80)).await;

        let value: Option<String> = cache.write().await.get("long_lived");
        assert_eq!(value.as_deref(), Some("value"));
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(shared_cache(Duration::from_secs(1)), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
