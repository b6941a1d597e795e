//! Key-Value Cache Module
//!
//! TTL-bounded, size-bounded cache with an in-memory hot layer mirroring a
//! durable store. The memory layer is authoritative for the running
//! process; durable writes are best effort.

use std::collections::HashMap;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, DurableStore, InsertionOrder, MemoryStore};
use crate::error::CacheError;

/// Prefix of every durable key written by the cache.
pub const DURABLE_PREFIX: &str = "cache_";

// == Config ==
/// Per-cache limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KvCacheConfig {
    /// TTL applied to every `set`
    pub ttl: Duration,
    /// Maximum number of in-memory entries, 0 = unbounded
    pub max_size: usize,
}

impl Default for KvCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_size: 100,
        }
    }
}

// == KV Cache ==
/// Persistent key-value cache.
///
/// Owned behind `Arc<RwLock<KvCache>>`; reads take the write lock because
/// they may purge expired entries or hydrate from durable storage.
#[derive(Debug)]
pub struct KvCache {
    entries: HashMap<String, CacheEntry<Value>>,
    order: InsertionOrder,
    durable: Box<dyn DurableStore>,
    stats: CacheStats,
    config: KvCacheConfig,
}

impl KvCache {
    // == Constructor ==
    /// Creates a cache mirroring into `durable`.
    pub fn new(config: KvCacheConfig, durable: Box<dyn DurableStore>) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            durable,
            stats: CacheStats::new(),
            config,
        }
    }

    /// Creates a cache whose "durable" layer is process-local.
    pub fn in_memory(config: KvCacheConfig) -> Self {
        Self::new(config, Box::new(MemoryStore::new()))
    }

    pub fn config(&self) -> KvCacheConfig {
        self.config
    }

    // == Set ==
    /// Stores `data` under `key` with the configured TTL.
    ///
    /// Evicts the oldest inserted entry first when a new key would push the
    /// cache past `max_size`. Never fails: serialization and persistence
    /// problems are logged and the call becomes a no-op or memory-only.
    pub fn set<T: Serialize>(&mut self, key: &str, data: &T) {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Cache set skipped: value is not serializable");
                self.stats.record_persist_failure();
                return;
            }
        };

        let entry = CacheEntry::new(key, value, self.config.ttl.as_millis() as u64);
        self.persist(&entry);
        self.insert_entry(entry);
    }

    // == Get ==
    /// Returns the value under `key` unless absent or expired.
    ///
    /// Checks memory first, then hydrates from durable storage. Expired
    /// entries are purged from both layers on the way out.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        if !self.entries.contains_key(key) && !self.hydrate(key) {
            self.stats.record_miss();
            return None;
        }

        let now = current_timestamp_ms();
        let expired = self
            .entries
            .get(key)
            .map(|entry| entry.is_expired_at(now))
            .unwrap_or(true);

        if expired {
            debug!(key, "Cache entry expired");
            self.purge(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        let decoded = self.entries.get(key).map(|entry| T::deserialize(&entry.data));
        match decoded {
            Some(Ok(data)) => {
                self.stats.record_hit();
                Some(data)
            }
            Some(Err(e)) => {
                warn!(key, error = %e, "Cached value has an unexpected shape");
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Peek Stale ==
    /// Returns the value under `key` whether or not it has expired.
    ///
    /// Leaves both layers, the insertion order and the hit/miss counters
    /// untouched.
    pub fn peek_stale<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        if let Some(entry) = self.entries.get(key) {
            return T::deserialize(&entry.data).ok();
        }
        let entry = self.read_durable(key)?;
        T::deserialize(&entry.data).ok()
    }

    // == Has ==
    /// Equivalent to `get(key).is_some()`; respects TTL.
    pub fn has(&mut self, key: &str) -> bool {
        self.get::<Value>(key).is_some()
    }

    // == Remove ==
    /// Removes `key` from memory and durable storage.
    pub fn remove(&mut self, key: &str) {
        self.purge(key);
    }

    // == Clear ==
    /// Drops every entry, including durable entries this session never read.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.set_total_entries(0);

        match self.durable.keys() {
            Ok(keys) => {
                for key in keys.iter().filter(|k| k.starts_with(DURABLE_PREFIX)) {
                    if let Err(e) = self.durable.delete(key) {
                        warn!(key = %key, error = %e, "Failed to delete durable cache entry");
                        self.stats.record_persist_failure();
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to list durable cache entries");
                self.stats.record_persist_failure();
            }
        }
    }

    // == Sweep Expired ==
    /// Eagerly removes expired entries from both layers.
    ///
    /// Only reclaims space; reads already ignore expired entries. Returns the
    /// number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = expired.len();
        for key in &expired {
            self.purge(key);
            self.stats.record_expiration();
        }

        // Durable-only entries from earlier sessions.
        let durable_keys = match self.durable.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Sweep could not list durable entries");
                self.stats.record_persist_failure();
                return removed;
            }
        };
        for durable_key in durable_keys {
            let Some(key) = durable_key.strip_prefix(DURABLE_PREFIX) else {
                continue;
            };
            if self.entries.contains_key(key) {
                continue;
            }
            if let Some(entry) = self.read_durable(key) {
                if entry.is_expired_at(now) {
                    self.delete_durable(key);
                    self.stats.record_expiration();
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!(removed, "Swept expired cache entries");
        }
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Number of entries in the in-memory layer (expired ones included until
    /// they are read or swept).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Internals ==
    fn insert_entry(&mut self, entry: CacheEntry<Value>) {
        let key = entry.key.clone();
        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.config.max_size > 0 && self.entries.len() >= self.config.max_size
        {
            if let Some(oldest) = self.order.evict_oldest() {
                debug!(key = %oldest, "Evicting oldest cache entry");
                self.entries.remove(&oldest);
                self.delete_durable(&oldest);
                self.stats.record_eviction();
            }
        }

        self.entries.insert(key.clone(), entry);
        self.order.record_insert(&key);
        self.stats.set_total_entries(self.entries.len());
    }

    /// Pulls `key` from durable storage into memory. Returns whether it is
    /// now present in memory.
    ///
    /// An expired durable copy is deleted without entering memory, so it
    /// cannot evict a live entry.
    fn hydrate(&mut self, key: &str) -> bool {
        let Some(entry) = self.read_durable(key) else {
            return false;
        };

        if entry.is_expired_at(current_timestamp_ms()) {
            debug!(key, "Durable cache entry expired");
            self.delete_durable(key);
            self.stats.record_expiration();
            return false;
        }

        debug!(key, "Hydrated cache entry from durable storage");
        self.insert_entry(entry);
        true
    }

    fn read_durable(&mut self, key: &str) -> Option<CacheEntry<Value>> {
        let durable_key = durable_key(key);
        let raw = match self.durable.read(&durable_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Durable cache read failed");
                self.stats.record_persist_failure();
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry<Value>>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, error = %e, "Discarding corrupt durable cache entry");
                self.stats.record_persist_failure();
                self.delete_durable(key);
                None
            }
        }
    }

    fn persist(&mut self, entry: &CacheEntry<Value>) {
        let result = serde_json::to_string(entry)
            .map_err(CacheError::from)
            .and_then(|raw| self.durable.write(&durable_key(&entry.key), &raw));

        if let Err(e) = result {
            warn!(key = %entry.key, error = %e, "Durable cache write failed; keeping entry in memory only");
            self.stats.record_persist_failure();
        }
    }

    fn purge(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.remove(key);
        self.delete_durable(key);
        self.stats.set_total_entries(self.entries.len());
    }

    fn delete_durable(&mut self, key: &str) {
        if let Err(e) = self.durable.delete(&durable_key(key)) {
            warn!(key, error = %e, "Durable cache delete failed");
            self.stats.record_persist_failure();
        }
    }
}

fn durable_key(key: &str) -> String {
    format!("{}{}", DURABLE_PREFIX, key)
}
