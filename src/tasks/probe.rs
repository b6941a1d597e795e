//! Connectivity Probe Task
//!
//! Flips the connectivity signal from upstream reachability. Any response,
//! whatever its status, counts as online.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::intercept::{Connectivity, FetchRequest, Fetcher};

pub fn spawn_probe_task(
    fetcher: Arc<dyn Fetcher>,
    connectivity: Connectivity,
    probe_url: String,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(url = %probe_url, interval = ?interval, "Starting connectivity probe");
        let request = FetchRequest::get(probe_url);

        loop {
            let reachable = match fetcher.fetch(&request).await {
                Ok(_) => true,
                Err(e) => {
                    debug!(error = %e, "Connectivity probe failed");
                    false
                }
            };
            connectivity.set_online(reachable);

            tokio::time::sleep(interval).await;
        }
    })
}
