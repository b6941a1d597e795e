//! Virtual Window Module
//!
//! Computes which slice of a long, fixed-height item list is on screen (plus
//! overscan) for a scroll position, so work stays bounded by the viewport
//! rather than by the collection size.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LOAD_MORE_THRESHOLD: f64 = 0.8;

// == Window Params ==
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowParams {
    /// Height of every item in pixels
    pub item_height: f64,
    /// Height of the scroll container in pixels
    pub container_height: f64,
    /// Extra items on each side of the visible range
    pub overscan: usize,
    /// Scrolled fraction at which `should_load_more` fires
    pub threshold: f64,
}

impl WindowParams {
    pub fn new(item_height: f64, container_height: f64, overscan: usize) -> Self {
        Self {
            item_height,
            container_height,
            overscan,
            threshold: DEFAULT_LOAD_MORE_THRESHOLD,
        }
    }

    /// Index bounds for `scroll_top` over `total` items.
    ///
    /// The range is `None` for an empty list or a non-positive item height.
    pub fn compute(&self, scroll_top: f64, total: usize) -> WindowBounds {
        let scroll_top = scroll_top.max(0.0);
        let content_height = total as f64 * self.item_height;
        let should_load_more = content_height > 0.0
            && (scroll_top + self.container_height) / content_height >= self.threshold;

        let range = if total == 0 || self.item_height <= 0.0 {
            None
        } else {
            let first_visible = (scroll_top / self.item_height).floor() as usize;
            let last_visible =
                ((scroll_top + self.container_height) / self.item_height).ceil() as usize;

            let start = first_visible.saturating_sub(self.overscan);
            let end = last_visible.saturating_add(self.overscan).min(total - 1);
            (start <= end).then_some((start, end))
        };

        WindowBounds {
            range,
            total_height: content_height.max(0.0),
            should_load_more,
        }
    }
}

/// Pure result of a window computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowBounds {
    /// Inclusive `(start_index, end_index)`
    pub range: Option<(usize, usize)>,
    /// Full scrollable height in pixels
    pub total_height: f64,
    /// Signal only; the caller decides whether to fetch more
    pub should_load_more: bool,
}

impl WindowBounds {
    pub fn start_index(&self) -> Option<usize> {
        self.range.map(|(start, _)| start)
    }

    pub fn end_index(&self) -> Option<usize> {
        self.range.map(|(_, end)| end)
    }

    pub fn len(&self) -> usize {
        self.range.map(|(start, end)| end - start + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleItem<'a, T> {
    pub item: &'a T,
    pub index: usize,
    /// Top offset of the item in pixels
    pub offset_px: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleWindow<'a, T> {
    pub bounds: WindowBounds,
    pub items: Vec<VisibleItem<'a, T>>,
}

// == Virtual Scroller ==
/// Window calculator over a borrowed list, remembering the last scroll
/// position.
#[derive(Debug, Clone)]
pub struct VirtualScroller<'a, T> {
    items: &'a [T],
    params: WindowParams,
    scroll_top: f64,
}

impl<'a, T> VirtualScroller<'a, T> {
    pub fn new(items: &'a [T], params: WindowParams) -> Self {
        Self {
            items,
            params,
            scroll_top: 0.0,
        }
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    /// Records a scroll event and returns the recomputed window.
    pub fn on_scroll(&mut self, scroll_top: f64) -> VisibleWindow<'a, T> {
        self.scroll_top = scroll_top.max(0.0);
        self.window()
    }

    /// Window at the last known scroll position.
    pub fn window(&self) -> VisibleWindow<'a, T> {
        let bounds = self.params.compute(self.scroll_top, self.items.len());
        let items = match bounds.range {
            Some((start, end)) => self.items[start..=end]
                .iter()
                .enumerate()
                .map(|(offset, item)| {
                    let index = start + offset;
                    VisibleItem {
                        item,
                        index,
                        offset_px: index as f64 * self.params.item_height,
                    }
                })
                .collect(),
            None => Vec::new(),
        };
        VisibleWindow { bounds, items }
    }
}
