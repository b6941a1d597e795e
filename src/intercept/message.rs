//! Request and response values passed through the interception layer.
//!
//! Both are cheap to clone (bodies are `Bytes`) so a strategy can return one
//! copy to the caller and store another.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Marker header added to API responses served from the cache fallback.
pub const SERVED_FROM_HEADER: &str = "x-served-from";

// == Destination ==
/// What the requester intends to do with the response, as reported by the
/// platform (`Sec-Fetch-Dest` on browsers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    #[default]
    Empty,
}

impl Destination {
    /// Parses a `Sec-Fetch-Dest` value; unknown values become `Empty`.
    pub fn from_fetch_dest(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Destination::Document,
            "image" => Destination::Image,
            "script" | "worker" | "serviceworker" | "sharedworker" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            _ => Destination::Empty,
        }
    }
}

// == Fetch Request ==
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    /// Absolute URL
    pub url: String,
    pub destination: Destination,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    /// GET request with no particular destination.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            destination: Destination::Empty,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn document(url: impl Into<String>) -> Self {
        Self::get(url).with_destination(Destination::Document)
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::get(url).with_destination(Destination::Image)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Only GET requests are ever answered from or written to a cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    pub fn accepts_html(&self) -> bool {
        self.headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|accept| accept.contains("text/html"))
            .unwrap_or(false)
    }
}

// == Fetch Response ==
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 200 response with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// JSON response; a value that fails to serialize yields an empty object.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self::new(status, body).with_header(header::CONTENT_TYPE, "application/json")
    }

    pub fn html(status: StatusCode, markup: &'static str) -> Self {
        Self::new(status, Bytes::from_static(markup.as_bytes()))
            .with_header(header::CONTENT_TYPE, "text/html; charset=utf-8")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, Bytes::from_static(b"Not Found"))
    }

    pub fn with_header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    /// Tags a response as coming from the cache fallback.
    pub fn served_from_cache(self) -> Self {
        self.with_header(HeaderName::from_static(SERVED_FROM_HEADER), "cache")
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for FetchResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        for (name, value) in self.headers.iter() {
            if is_hop_by_hop(name) {
                continue;
            }
            response.headers_mut().append(name.clone(), value.clone());
        }
        response
    }
}

/// Headers that describe one connection and must not be forwarded.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-connection"
            | "transfer-encoding"
            | "upgrade"
            | "te"
            | "trailer"
            | "content-length"
            | "host"
    )
}
