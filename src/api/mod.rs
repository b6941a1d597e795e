//! API Module
//!
//! HTTP handlers and routing for the offline caching proxy.
//!
//! # Endpoints
//! - `/__offline/*` - Diagnostics and control
//! - everything else - Proxied through the interception layer

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
