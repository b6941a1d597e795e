//! Cache Module
//!
//! Persistent key-value cache: TTL expiry, oldest-first eviction and an
//! in-memory layer mirrored into durable storage.

mod durable;
mod entry;
mod order;
mod stats;
mod store;


// Re-export public types
pub use durable::{DurableStore, FileStore, MemoryStore};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use order::InsertionOrder;
pub use stats::CacheStats;
pub use store::{KvCache, KvCacheConfig, DURABLE_PREFIX};
