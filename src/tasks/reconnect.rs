//! Sync On Reconnect Task
//!
//! Runs an opportunistic catalog sync on every offline to online transition.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::intercept::Connectivity;
use crate::offline::ProductStore;

pub fn spawn_reconnect_sync_task(connectivity: Connectivity, store: ProductStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rx = connectivity.subscribe();
        let mut was_online = *rx.borrow_and_update();

        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online && !was_online {
                info!("Back online, syncing catalog");
                let outcome = store.sync(false).await;
                match outcome.error {
                    Some(error) => warn!(error = %error, "Reconnect sync failed"),
                    None => debug!(source = ?outcome.source, "Reconnect sync finished"),
                }
            }
            was_online = online;
        }
    })
}
