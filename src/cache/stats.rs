//! Cache Statistics Module
//!
//! Tracks key-value cache counters including hits, misses, evictions and
//! swallowed persistence failures.

use serde::Serialize;

// == Cache Stats ==
/// Tracks key-value cache metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful reads
    pub hits: u64,
    /// Number of reads that found nothing (absent or expired)
    pub misses: u64,
    /// Number of entries evicted because the cache was at `max_size`
    pub evictions: u64,
    /// Number of entries dropped on expiry detection
    pub expirations: u64,
    /// Durable-storage failures that were logged and swallowed
    pub persist_failures: u64,
    /// Current number of entries in the in-memory layer
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_persist_failure(&mut self) {
        self.persist_failures += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
