//! Responsive image URL rewriting.
//!
//! Narrower viewports request narrower images; quality and format ride
//! along as query parameters understood by the image transform endpoint.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const DEFAULT_QUALITY: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Webp,
    Avif,
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }
}

/// Image width to request for a given viewport width.
pub fn responsive_width(viewport_width: u32) -> u32 {
    match viewport_width {
        0..=640 => 640,
        641..=1024 => 1024,
        _ => 1920,
    }
}

/// Appends `width`, `quality` and `format` to `src`.
///
/// Inline (`data:`/`blob:`) sources and SVGs are returned unchanged.
pub fn optimized_url(src: &str, viewport_width: u32, quality: u8, format: ImageFormat) -> String {
    if src.starts_with("data:") || src.starts_with("blob:") {
        return src.to_string();
    }

    let (base, fragment) = match src.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (src, None),
    };
    let path = base.split('?').next().unwrap_or(base);
    if path.to_ascii_lowercase().ends_with(".svg") {
        return src.to_string();
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("width", &responsive_width(viewport_width).to_string())
        .append_pair("quality", &quality.to_string())
        .append_pair("format", format.as_str())
        .finish();

    let separator = if base.contains('?') { '&' } else { '?' };
    match fragment {
        Some(fragment) => format!("{}{}{}#{}", base, separator, query, fragment),
        None => format!("{}{}{}", base, separator, query),
    }
}
