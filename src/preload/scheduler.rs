//! Prioritized, throttled image preloading.
//!
//! High-priority images load together and finish before any low-priority
//! image starts. Low-priority images go out in small batches with a pause
//! between batches so they never saturate the connection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::preload::responsive::{optimized_url, ImageFormat, DEFAULT_QUALITY};
use crate::preload::ImageLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreloadOptions {
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub quality: Option<u8>,
    #[serde(default)]
    pub format: Option<ImageFormat>,
}

impl PreloadOptions {
    pub fn high() -> Self {
        Self {
            priority: Priority::High,
            ..Self::default()
        }
    }

    pub fn low() -> Self {
        Self::default()
    }
}

/// One queued preload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadItem {
    pub src: String,
    #[serde(flatten)]
    pub options: PreloadOptions,
}

impl PreloadItem {
    pub fn new(src: impl Into<String>, options: PreloadOptions) -> Self {
        Self {
            src: src.into(),
            options,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PreloadConfig {
    /// Low-priority loads in flight at once
    pub batch_size: usize,
    /// Pause between low-priority batches
    pub batch_delay: Duration,
    /// Cap for `preload_next_page`
    pub next_page_limit: usize,
    pub viewport_width: u32,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            batch_delay: Duration::from_millis(100),
            next_page_limit: 6,
            viewport_width: 1280,
        }
    }
}

#[derive(Debug, Default)]
struct PreloadState {
    loaded: HashSet<String>,
    loading: HashSet<String>,
}

// == Image Preloader ==
/// Preload scheduler; clones share the loaded/loading sets.
///
/// There is no cancellation: a dispatched load runs to completion. Only the
/// loaded set prevents repeated work.
#[derive(Clone)]
pub struct ImagePreloader {
    loader: Arc<dyn ImageLoader>,
    state: Arc<Mutex<PreloadState>>,
    viewport_width: Arc<AtomicU32>,
    config: PreloadConfig,
}

impl ImagePreloader {
    pub fn new(loader: Arc<dyn ImageLoader>, config: PreloadConfig) -> Self {
        Self {
            loader,
            state: Arc::new(Mutex::new(PreloadState::default())),
            viewport_width: Arc::new(AtomicU32::new(config.viewport_width)),
            config,
        }
    }

    pub fn set_viewport_width(&self, width: u32) {
        self.viewport_width.store(width, Ordering::Relaxed);
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width.load(Ordering::Relaxed)
    }

    pub fn is_loaded(&self, src: &str) -> bool {
        self.state().loaded.contains(src)
    }

    pub fn loaded_count(&self) -> usize {
        self.state().loaded.len()
    }

    // == Preload ==
    /// Loads one image at the viewport-appropriate size.
    ///
    /// No-op when `src` is already loaded or currently loading. Failures are
    /// returned, not retried.
    pub async fn preload(&self, src: &str, options: PreloadOptions) -> Result<(), FetchError> {
        {
            let mut state = self.state();
            if state.loaded.contains(src) || state.loading.contains(src) {
                debug!(src, "Preload skipped: already handled");
                return Ok(());
            }
            state.loading.insert(src.to_string());
        }

        let url = optimized_url(
            src,
            self.viewport_width(),
            options.quality.unwrap_or(DEFAULT_QUALITY),
            options.format.unwrap_or_default(),
        );
        let result = self.loader.load(&url).await;

        let mut state = self.state();
        state.loading.remove(src);
        match &result {
            Ok(()) => {
                state.loaded.insert(src.to_string());
            }
            Err(e) => warn!(src, error = %e, "Image preload failed"),
        }
        result
    }

    // == Batch Preload ==
    /// All high-priority items concurrently, then low-priority items in
    /// batches of `batch_size` separated by `batch_delay`.
    pub async fn batch_preload(&self, items: Vec<PreloadItem>) -> BatchReport {
        let (high, low): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|item| item.options.priority == Priority::High);

        let mut report = BatchReport::default();
        self.run_together(high, &mut report).await;

        let batch_size = self.config.batch_size.max(1);
        for (index, batch) in low.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            self.run_together(batch.to_vec(), &mut report).await;
        }

        debug!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Batch preload settled"
        );
        report
    }

    // == Next Page ==
    /// Warms up to `next_page_limit` not-yet-loaded images at low priority.
    pub async fn preload_next_page(&self, images: Vec<String>) -> BatchReport {
        let items: Vec<PreloadItem> = images
            .into_iter()
            .filter(|src| !self.is_loaded(src))
            .take(self.config.next_page_limit)
            .map(|src| PreloadItem::new(src, PreloadOptions::low()))
            .collect();
        self.batch_preload(items).await
    }

    /// Runs every item concurrently and waits for all of them to settle.
    async fn run_together(&self, items: Vec<PreloadItem>, report: &mut BatchReport) {
        let mut set = JoinSet::new();
        for item in items {
            let preloader = self.clone();
            set.spawn(async move {
                let result = preloader.preload(&item.src, item.options).await;
                (item.src, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((src, Ok(()))) => report.loaded.push(src),
                Ok((src, Err(_))) => report.failed.push(src),
                Err(e) => warn!(error = %e, "Preload task aborted"),
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, PreloadState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    /// Loader that takes a fixed time per image and records what it saw.
    #[derive(Default)]
    struct RecordingLoader {
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        events: Mutex<Vec<String>>,
        fail_containing: Option<&'static str>,
    }

    impl RecordingLoader {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageLoader for RecordingLoader {
        async fn load(&self, url: &str) -> Result<(), FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.events.lock().unwrap().push(format!("start {}", url));

            tokio::time::sleep(self.delay).await;

            self.events.lock().unwrap().push(format!("end {}", url));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match self.fail_containing {
                Some(marker) if url.contains(marker) => {
                    Err(FetchError::Network("broken image".to_string()))
                }
                _ => Ok(()),
            }
        }
    }

    fn preloader(loader: Arc<RecordingLoader>) -> ImagePreloader {
        ImagePreloader::new(loader, PreloadConfig::default())
    }

    #[tokio::test]
    async fn test_preload_rewrites_url_and_marks_loaded() {
        let loader = Arc::new(RecordingLoader::default());
        let preloader = preloader(loader.clone());
        preloader.set_viewport_width(375);

        preloader
            .preload("/p/1.jpg", PreloadOptions::high())
            .await
            .unwrap();

        assert!(preloader.is_loaded("/p/1.jpg"));
        assert_eq!(loader.events()[0], "start /p/1.jpg?width=640&quality=75&format=webp");
    }

    #[tokio::test]
    async fn test_preload_is_deduplicated() {
        let loader = Arc::new(RecordingLoader::default());
        let preloader = preloader(loader.clone());

        preloader.preload("/a.jpg", PreloadOptions::low()).await.unwrap();
        preloader.preload("/a.jpg", PreloadOptions::low()).await.unwrap();

        assert_eq!(loader.events().len(), 2, "one start and one end");
    }

    #[tokio::test]
    async fn test_failed_preload_is_not_marked_and_not_retried() {
        let loader = Arc::new(RecordingLoader {
            fail_containing: Some("broken"),
            ..RecordingLoader::default()
        });
        let preloader = preloader(loader.clone());

        assert!(preloader.preload("/broken.jpg", PreloadOptions::low()).await.is_err());
        assert!(!preloader.is_loaded("/broken.jpg"));
        assert_eq!(loader.events().len(), 2);
    }

    #[tokio::test]
    async fn test_low_priority_concurrency_is_bounded_and_throttled() {
        let loader = Arc::new(RecordingLoader::with_delay(Duration::from_millis(20)));
        let preloader = preloader(loader.clone());
        let items = (0..10)
            .map(|i| PreloadItem::new(format!("/low/{}.jpg", i), PreloadOptions::low()))
            .collect();

        let started = Instant::now();
        let report = preloader.batch_preload(items).await;
        let elapsed = started.elapsed();

        assert_eq!(report.loaded.len(), 10);
        assert!(loader.max_in_flight.load(Ordering::SeqCst) <= 3);
        // 4 batches -> 3 pauses of 100ms.
        assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_high_priority_settles_before_low_starts() {
        let loader = Arc::new(RecordingLoader {
            delay: Duration::from_millis(10),
            fail_containing: Some("high/1"),
            ..RecordingLoader::default()
        });
        let preloader = preloader(loader.clone());
        let items = vec![
            PreloadItem::new("/low/0.jpg", PreloadOptions::low()),
            PreloadItem::new("/high/0.jpg", PreloadOptions::high()),
            PreloadItem::new("/low/1.jpg", PreloadOptions::low()),
            PreloadItem::new("/high/1.jpg", PreloadOptions::high()),
        ];

        let report = preloader.batch_preload(items).await;

        let events = loader.events();
        let last_high_end = events
            .iter()
            .rposition(|e| e.starts_with("end /high"))
            .unwrap();
        let first_low_start = events
            .iter()
            .position(|e| e.starts_with("start /low"))
            .unwrap();
        assert!(last_high_end < first_low_start, "events: {:?}", events);
        assert_eq!(report.failed, vec!["/high/1.jpg".to_string()]);
        assert_eq!(report.loaded.len(), 3);
    }

    #[tokio::test]
    async fn test_next_page_skips_loaded_and_caps_at_six() {
        let loader = Arc::new(RecordingLoader::default());
        let preloader = preloader(loader.clone());
        preloader.preload("/n/0.jpg", PreloadOptions::low()).await.unwrap();

        let images = (0..10).map(|i| format!("/n/{}.jpg", i)).collect();
        let report = preloader.preload_next_page(images).await;

        assert_eq!(report.loaded.len(), 6);
        assert!(!report.loaded.contains(&"/n/0.jpg".to_string()));
        assert_eq!(preloader.loaded_count(), 7);
    }

    #[test]
    fn test_item_deserializes_with_flattened_options() {
        let item: PreloadItem =
            serde_json::from_str(r#"{"src":"/a.jpg","priority":"high","quality":50}"#).unwrap();
        assert_eq!(item.options.priority, Priority::High);
        assert_eq!(item.options.quality, Some(50));
        assert_eq!(item.options.format, None);

        let item: PreloadItem = serde_json::from_str(r#"{"src":"/b.jpg"}"#).unwrap();
        assert_eq!(item.options.priority, Priority::Low);
    }
}
