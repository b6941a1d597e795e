//! Network fetch seam.
//!
//! Strategies only ever talk to the network through `Fetcher`, which keeps
//! them independent of the HTTP client and lets tests script the network.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::intercept::message::{is_hop_by_hop, FetchRequest, FetchResponse};

#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Performs one request. Any HTTP status is a successful fetch; only
    /// transport failures are errors.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

// == HTTP Fetcher ==
/// `reqwest`-backed fetcher used by the binary.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        debug!(method = %request.method, url = %request.url, "Fetching from network");

        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in request.headers.iter() {
            if !is_hop_by_hop(name) {
                builder = builder.header(name, value);
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
