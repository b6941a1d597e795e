//! Network Interception Layer
//!
//! Classifies outgoing requests and answers them with a per-class caching
//! strategy over the versioned partitions.

mod classify;
mod connectivity;
mod fallback;
mod fetcher;
mod interceptor;
mod message;
mod notification;
mod strategy;

#[cfg(test)]
pub(crate) mod mock;

pub use classify::{ClassifyRules, ResourceClass};
pub use connectivity::Connectivity;
pub use fallback::{offline_json, offline_page, OfflineError, OFFLINE_PAGE};
pub use fetcher::{Fetcher, HttpFetcher};
pub use interceptor::{
    ActivateReport, InstallReport, InterceptConfig, Interceptor, OfflineInterceptor,
    RefreshOutcome,
};
pub use message::{Destination, FetchRequest, FetchResponse, SERVED_FROM_HEADER};
pub use notification::{Notification, NOTIFICATION_ROUTE};
