//! Fixed responses used when neither network nor cache can answer.

use axum::http::StatusCode;
use serde::Serialize;

use crate::intercept::message::FetchResponse;

/// Self-contained offline page: no external assets, inline styles only.
pub const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Offline</title>
<style>
body{margin:0;min-height:100vh;display:flex;align-items:center;justify-content:center;font-family:system-ui,sans-serif;background:#f8fafc;color:#0f172a}
main{text-align:center;padding:2rem;max-width:28rem}
h1{font-size:1.5rem;margin-bottom:.5rem}
p{color:#475569}
button{margin-top:1rem;padding:.75rem 1.5rem;border:0;border-radius:.5rem;background:#0f172a;color:#fff;font-size:1rem;cursor:pointer}
</style>
</head>
<body>
<main>
<h1>You are offline</h1>
<p>This page is not available without a connection. Check your network and try again.</p>
<button type="button" onclick="window.location.reload()">Retry</button>
</main>
</body>
</html>
"#;

/// Body of the structured 503 returned for data requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfflineError {
    pub error: String,
    pub offline: bool,
}

/// 503 with the fixed offline page.
pub fn offline_page() -> FetchResponse {
    FetchResponse::html(StatusCode::SERVICE_UNAVAILABLE, OFFLINE_PAGE)
}

/// 503 with `{ error, offline: true }`.
pub fn offline_json(message: impl Into<String>) -> FetchResponse {
    FetchResponse::json(
        StatusCode::SERVICE_UNAVAILABLE,
        &OfflineError {
            error: message.into(),
            offline: true,
        },
    )
}
