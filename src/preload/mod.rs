//! Image Preload Module
//!
//! Background warming of images likely to be needed next.

mod loader;
mod responsive;
mod scheduler;

pub use loader::{ImageLoader, InterceptorImageLoader};
pub use responsive::{optimized_url, responsive_width, ImageFormat, DEFAULT_QUALITY};
pub use scheduler::{
    BatchReport, ImagePreloader, PreloadConfig, PreloadItem, PreloadOptions, Priority,
};
