//! Versioned partition manager.
//!
//! Partition names are `{kind}-{version}`. Changing the version string is
//! the only invalidation mechanism: activation deletes every partition that
//! is not part of the current version set.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::intercept::FetchResponse;
use crate::partition::CacheStorage;

// == Partition Kind ==
/// Resource class owning a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Static,
    Images,
    Api,
    Products,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 4] = [
        PartitionKind::Static,
        PartitionKind::Images,
        PartitionKind::Api,
        PartitionKind::Products,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Images => "images",
            PartitionKind::Api => "api",
            PartitionKind::Products => "products",
        }
    }
}

/// Per-kind entry limits; `None` = unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionLimits {
    pub static_assets: Option<usize>,
    pub images: Option<usize>,
    pub api: Option<usize>,
    pub products: Option<usize>,
}

impl PartitionLimits {
    pub fn for_kind(&self, kind: PartitionKind) -> Option<usize> {
        match kind {
            PartitionKind::Static => self.static_assets,
            PartitionKind::Images => self.images,
            PartitionKind::Api => self.api,
            PartitionKind::Products => self.products,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub name: String,
    pub entries: usize,
}

// == Partition Manager ==
/// Maps partition kinds to physical partitions for one version.
///
/// Clones share the same underlying storage.
#[derive(Debug, Clone)]
pub struct PartitionManager {
    storage: Arc<RwLock<CacheStorage>>,
    version: String,
    limits: PartitionLimits,
}

impl PartitionManager {
    pub fn new(
        storage: Arc<RwLock<CacheStorage>>,
        version: impl Into<String>,
        limits: PartitionLimits,
    ) -> Self {
        Self {
            storage,
            version: version.into(),
            limits,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn storage(&self) -> Arc<RwLock<CacheStorage>> {
        self.storage.clone()
    }

    /// Full partition name for `kind` under the current version.
    pub fn name_for(&self, kind: PartitionKind) -> String {
        format!("{}-{}", kind.prefix(), self.version)
    }

    pub fn expected_names(&self) -> Vec<String> {
        PartitionKind::ALL
            .iter()
            .map(|kind| self.name_for(*kind))
            .collect()
    }

    /// Stores a response, creating the partition on first write.
    pub async fn put(&self, kind: PartitionKind, url: &str, response: FetchResponse) {
        let name = self.name_for(kind);
        let mut storage = self.storage.write().await;
        storage
            .open(&name, self.limits.for_kind(kind))
            .put(url, response);
        debug!(partition = %name, url, "Stored response");
    }

    /// Any cached response for `url`, however old.
    pub async fn lookup(&self, kind: PartitionKind, url: &str) -> Option<FetchResponse> {
        let storage = self.storage.read().await;
        storage
            .get(&self.name_for(kind))
            .and_then(|partition| partition.lookup(url))
            .map(|stored| stored.response.clone())
    }

    /// Cached response for `url` younger than `max_age`.
    pub async fn lookup_fresh(
        &self,
        kind: PartitionKind,
        url: &str,
        max_age: Duration,
    ) -> Option<FetchResponse> {
        let storage = self.storage.read().await;
        storage
            .get(&self.name_for(kind))
            .and_then(|partition| partition.lookup_fresh(url, max_age))
            .map(|stored| stored.response.clone())
    }

    /// Creates every partition of the current version, even if left empty.
    pub async fn create_all(&self) {
        let mut storage = self.storage.write().await;
        for kind in PartitionKind::ALL {
            storage.open(&self.name_for(kind), self.limits.for_kind(kind));
        }
    }

    /// Deletes every partition outside the current version set and returns
    /// the deleted names.
    pub async fn activate(&self) -> Vec<String> {
        let expected = self.expected_names();
        let mut storage = self.storage.write().await;

        let stale: Vec<String> = storage
            .names()
            .into_iter()
            .filter(|name| !expected.contains(name))
            .collect();

        for name in &stale {
            storage.delete(name);
            info!(partition = %name, "Deleted outdated partition");
        }
        stale
    }

    pub async fn stats(&self) -> Vec<PartitionStats> {
        let storage = self.storage.read().await;
        storage
            .names()
            .into_iter()
            .filter_map(|name| {
                storage.get(&name).map(|partition| PartitionStats {
                    entries: partition.len(),
                    name,
                })
            })
            .collect()
    }
}
