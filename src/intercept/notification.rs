//! Push payloads turned into system notifications.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Route opened when a notification is clicked.
pub const NOTIFICATION_ROUTE: &str = "/";

const DEFAULT_TITLE: &str = "New update";
const DEFAULT_ICON: &str = "/favicon.ico";

#[derive(Debug, Clone, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl Notification {
    /// Builds a notification from a JSON push payload. Missing fields get
    /// defaults; a non-JSON payload is used verbatim as the body.
    pub fn from_payload(payload: &[u8]) -> Self {
        let parsed = match serde_json::from_slice::<PushPayload>(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Push payload is not JSON; using it as text");
                PushPayload {
                    body: Some(String::from_utf8_lossy(payload).into_owned()),
                    ..PushPayload::default()
                }
            }
        };

        Self {
            title: parsed.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: parsed.body.unwrap_or_default(),
            icon: parsed.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        }
    }
}
