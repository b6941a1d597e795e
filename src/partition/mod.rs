//! Partition Module
//!
//! Named, versioned response caches: one partition per resource class.

mod manager;
mod storage;

pub use manager::{PartitionKind, PartitionLimits, PartitionManager, PartitionStats};
pub use storage::{CacheStorage, Partition, StoredResponse};
