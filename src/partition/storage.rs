//! Physical response storage: named partitions of URL → response pairs.
//!
//! This is the primitive the partition manager versions. It knows nothing
//! about versions itself; every partition is just a name.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{current_timestamp_ms, InsertionOrder};
use crate::intercept::FetchResponse;

// == Stored Response ==
#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub response: FetchResponse,
    /// Unix milliseconds
    pub stored_at: u64,
}

impl StoredResponse {
    pub fn is_fresh(&self, max_age: Duration, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.stored_at) < max_age.as_millis() as u64
    }
}

// == Partition ==
/// One named collection of responses, optionally bounded in entry count.
#[derive(Debug, Clone)]
pub struct Partition {
    name: String,
    entries: HashMap<String, StoredResponse>,
    order: InsertionOrder,
    max_entries: Option<usize>,
}

impl Partition {
    pub fn new(name: impl Into<String>, max_entries: Option<usize>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            max_entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores `response` under `url`, evicting the oldest insertion when full.
    /// Returns the evicted URL, if any.
    pub fn put(&mut self, url: &str, response: FetchResponse) -> Option<String> {
        let mut evicted = None;
        if let Some(max) = self.max_entries {
            if !self.entries.contains_key(url) && max > 0 && self.entries.len() >= max {
                evicted = self.order.evict_oldest();
                if let Some(oldest) = &evicted {
                    debug!(partition = %self.name, url = %oldest, "Evicting oldest response");
                    self.entries.remove(oldest);
                }
            }
        }

        self.entries.insert(
            url.to_string(),
            StoredResponse {
                response,
                stored_at: current_timestamp_ms(),
            },
        );
        self.order.record_insert(url);
        evicted
    }

    /// Any stored response, regardless of age.
    pub fn lookup(&self, url: &str) -> Option<&StoredResponse> {
        self.entries.get(url)
    }

    /// Stored response younger than `max_age`.
    pub fn lookup_fresh(&self, url: &str, max_age: Duration) -> Option<&StoredResponse> {
        let now = current_timestamp_ms();
        self.entries
            .get(url)
            .filter(|stored| stored.is_fresh(max_age, now))
    }

    pub fn delete(&mut self, url: &str) -> bool {
        self.order.remove(url);
        self.entries.remove(url).is_some()
    }

    pub fn urls(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Cache Storage ==
/// All partitions, keyed by full (versioned) name.
#[derive(Debug, Default)]
pub struct CacheStorage {
    partitions: HashMap<String, Partition>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the partition, creating it empty on first access.
    pub fn open(&mut self, name: &str, max_entries: Option<usize>) -> &mut Partition {
        self.partitions
            .entry(name.to_string())
            .or_insert_with(|| Partition::new(name, max_entries))
    }

    pub fn get(&self, name: &str) -> Option<&Partition> {
        self.partitions.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.partitions.contains_key(name)
    }

    /// Drops a partition and everything in it.
    pub fn delete(&mut self, name: &str) -> bool {
        self.partitions.remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.partitions.keys().cloned().collect();
        names.sort();
        names
    }
}
