//! Request DTOs for the diagnostics API
//!
//! Defines the structure of incoming query strings and request bodies.

use serde::Deserialize;

use crate::preload::PreloadItem;
use crate::window::{WindowParams, DEFAULT_LOAD_MORE_THRESHOLD};

/// Query string of `POST /__offline/sync`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncQuery {
    /// Refresh even if a fresh snapshot is cached
    #[serde(default)]
    pub force: bool,
}

/// Request body of `PUT /__offline/connectivity`
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

/// Request body of `POST /__offline/preload`
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    pub items: Vec<PreloadItem>,
    /// Updates the viewport used for responsive rewriting
    #[serde(default)]
    pub viewport_width: Option<u32>,
}

impl PreloadRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.items.is_empty() {
            return Some("At least one item is required".to_string());
        }
        if self.items.iter().any(|item| item.src.trim().is_empty()) {
            return Some("Item src cannot be empty".to_string());
        }
        if self.viewport_width == Some(0) {
            return Some("viewport_width must be positive".to_string());
        }
        None
    }
}

/// Query string of `GET /__offline/window`
#[derive(Debug, Clone, Deserialize)]
pub struct WindowQuery {
    #[serde(default)]
    pub scroll_top: f64,
    pub item_height: f64,
    pub container_height: f64,
    #[serde(default)]
    pub overscan: usize,
    pub total: usize,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl WindowQuery {
    pub fn validate(&self) -> Option<String> {
        if self.item_height.is_nan() || self.item_height <= 0.0 {
            return Some("item_height must be positive".to_string());
        }
        if self.container_height.is_nan() || self.container_height < 0.0 {
            return Some("container_height cannot be negative".to_string());
        }
        None
    }

    pub fn params(&self) -> WindowParams {
        WindowParams {
            threshold: self.threshold.unwrap_or(DEFAULT_LOAD_MORE_THRESHOLD),
            ..WindowParams::new(self.item_height, self.container_height, self.overscan)
        }
    }
}
