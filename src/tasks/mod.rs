//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the proxy.
//!
//! # Tasks
//! - TTL Sweep: reclaims expired key-value entries at configured intervals
//! - Connectivity Probe: keeps the online flag in step with the upstream
//! - Reconnect Sync: refreshes the catalog when connectivity returns

mod cleanup;
mod probe;
mod reconnect;

pub use cleanup::spawn_cleanup_task;
pub use probe::spawn_probe_task;
pub use reconnect::spawn_reconnect_sync_task;
