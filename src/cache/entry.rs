//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cached value tagged with its storage time and TTL.
///
/// Entries are never mutated; a new `set` under the same key replaces the
/// entry wholesale. The same shape is written to durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// Key the entry was stored under
    pub key: String,
    /// The stored value
    pub data: T,
    /// Storage timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Time to live in milliseconds
    pub ttl_ms: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(key: impl Into<String>, data: T, ttl_ms: u64) -> Self {
        Self {
            key: key.into(),
            data,
            stored_at: current_timestamp_ms(),
            ttl_ms,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is valid iff `now - stored_at < ttl_ms`, so it is already
    /// expired at exactly `stored_at + ttl_ms`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.stored_at) >= self.ttl_ms
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self) -> u64 {
        let age = current_timestamp_ms().saturating_sub(self.stored_at);
        self.ttl_ms.saturating_sub(age)
    }

    /// Converts the payload while keeping the metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            key: self.key,
            data: f(self.data),
            stored_at: self.stored_at,
            ttl_ms: self.ttl_ms,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
