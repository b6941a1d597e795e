//! Where catalog data comes from when the network is available.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::FetchError;
use crate::intercept::{FetchRequest, Fetcher};
use crate::offline::{CategorySummary, ProductSummary};

pub const PRODUCTS_PATH: &str = "/rest/v1/products?select=*";
pub const CATEGORIES_PATH: &str = "/rest/v1/categories?select=*";

#[async_trait]
pub trait CatalogSource: Send + Sync + 'static {
    async fn fetch_products(&self) -> Result<Vec<ProductSummary>, FetchError>;
    async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, FetchError>;
}

/// Reads the catalog from the storefront's REST data service.
///
/// Goes straight to the fetcher, not through the interceptor, so a sync
/// never gets answered from the API partition.
#[derive(Clone)]
pub struct RestCatalogSource {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
}

impl RestCatalogSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let request = FetchRequest::get(&url).with_header("accept", "application/json");
        let response = self.fetcher.fetch(&request).await?;

        if !response.is_success() {
            return Err(FetchError::Network(format!(
                "{} answered {}",
                url, response.status
            )));
        }

        debug!(url = %url, bytes = response.body.len(), "Catalog page fetched");
        serde_json::from_slice(&response.body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogSource for RestCatalogSource {
    async fn fetch_products(&self) -> Result<Vec<ProductSummary>, FetchError> {
        self.fetch_json(PRODUCTS_PATH).await
    }

    async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, FetchError> {
        self.fetch_json(CATEGORIES_PATH).await
    }
}
