//! Resource classification.
//!
//! Decides which caching strategy handles a request, from its destination,
//! path and host.

use url::Url;

use crate::intercept::message::{Destination, FetchRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    Document,
    Image,
    Api,
    Product,
    Static,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico"];

/// Path and host rules for the data classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRules {
    /// Path prefixes of product/category data. Checked before `api_prefixes`.
    pub product_prefixes: Vec<String>,
    pub api_prefixes: Vec<String>,
    /// Hostnames (or host suffixes) whose every request is API data.
    pub api_hosts: Vec<String>,
}

impl Default for ClassifyRules {
    fn default() -> Self {
        Self {
            product_prefixes: vec![
                "/rest/v1/products".to_string(),
                "/rest/v1/categories".to_string(),
                "/api/products".to_string(),
                "/api/categories".to_string(),
            ],
            api_prefixes: vec![
                "/api/".to_string(),
                "/rest/v1/".to_string(),
                "/functions/v1/".to_string(),
            ],
            api_hosts: Vec::new(),
        }
    }
}

impl ClassifyRules {
    pub fn classify(&self, request: &FetchRequest) -> ResourceClass {
        let Ok(url) = Url::parse(&request.url) else {
            return ResourceClass::Static;
        };
        let path = url.path();
        let host = url.host_str().unwrap_or_default();

        if self.product_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return ResourceClass::Product;
        }
        if self.api_prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || self.api_hosts.iter().any(|h| host_matches(host, h))
        {
            return ResourceClass::Api;
        }
        if request.destination == Destination::Document
            || (request.destination == Destination::Empty && request.accepts_html())
        {
            return ResourceClass::Document;
        }
        if request.destination == Destination::Image || has_image_extension(path) {
            return ResourceClass::Image;
        }
        ResourceClass::Static
    }
}

fn host_matches(host: &str, rule: &str) -> bool {
    host == rule || host.ends_with(&format!(".{}", rule))
}

fn has_image_extension(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
