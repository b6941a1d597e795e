//! Catalog records and the snapshot that holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Last known good catalog. Replaced whole on every successful sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub schema_version: u32,
    pub products: Vec<ProductSummary>,
    pub categories: Vec<CategorySummary>,
    pub last_sync: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Builds a current-version snapshot stamped with the present time.
    pub fn new(products: Vec<ProductSummary>, categories: Vec<CategorySummary>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            products,
            categories,
            last_sync: Utc::now(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.products.len()
    }

    pub fn is_current_schema(&self) -> bool {
        self.schema_version == SNAPSHOT_SCHEMA_VERSION
    }

    pub fn product(&self, id: &str) -> Option<&ProductSummary> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn products_in(&self, category_id: &str) -> impl Iterator<Item = &ProductSummary> {
        let category_id = category_id.to_string();
        self.products
            .iter()
            .filter(move |p| p.category_id.as_deref() == Some(category_id.as_str()))
    }
}
