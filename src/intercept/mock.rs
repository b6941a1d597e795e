//! Scripted network used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::intercept::{FetchRequest, FetchResponse, Fetcher};

#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, FetchResponse>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<FetchRequest>>,
    offline: AtomicBool,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &str, response: FetchResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub(crate) fn last_request(&self, url: &str) -> Option<FetchRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.url == url)
            .cloned()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.requests.lock().unwrap().push(request.clone());

        let delay = self.delays.lock().unwrap().get(&request.url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network("connection refused".to_string()));
        }

        let routed = self.routes.lock().unwrap().get(&request.url).cloned();
        Ok(routed.unwrap_or_else(FetchResponse::not_found))
    }
}
