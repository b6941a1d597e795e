//! Offline Product Store Module
//!
//! Catalog snapshot synchronization on top of the key-value cache.

mod model;
mod source;
mod store;

pub use model::{
    CatalogSnapshot, CategorySummary, ProductSummary, ProductVariant, SNAPSHOT_SCHEMA_VERSION,
};
pub use source::{CatalogSource, RestCatalogSource, CATEGORIES_PATH, PRODUCTS_PATH};
pub use store::{ProductStore, StoreState, StoreStats, SyncOutcome, SyncSource, SNAPSHOT_KEY};
