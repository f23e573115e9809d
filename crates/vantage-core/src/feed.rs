//! Infinite feed paging over an in-memory list
//!
//! Reveals items page by page as the user nears the end of the document.
//! Each revealed item typically mounts one media slot.

use serde::Serialize;
use tracing::debug;

/// Items revealed per page
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Distance from the document end at which the next page is requested
pub const LOAD_MORE_MARGIN: f64 = 1000.0;

/// Paging state over a fixed list of items
#[derive(Debug, Clone)]
pub struct InfiniteFeed<T> {
    items: Vec<T>,
    page_size: usize,
    current_page: usize,
    displayed: usize,
    is_loading: bool,
}

/// Counters for rendering a "showing N of M" footer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedStatus {
    pub displayed: usize,
    pub total: usize,
    pub has_more: bool,
    pub is_loading: bool,
}

impl<T> InfiniteFeed<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self::with_page_size(items, DEFAULT_PAGE_SIZE)
    }

    /// Feed with a custom page size (at least one item per page)
    pub fn with_page_size(items: Vec<T>, page_size: usize) -> Self {
        Self {
            items,
            page_size: page_size.max(1),
            current_page: 0,
            displayed: 0,
            is_loading: false,
        }
    }

    /// Start fetching the next page.
    ///
    /// Returns false while a page is already in flight or when the feed is
    /// exhausted.
    pub fn begin_load(&mut self) -> bool {
        if self.is_loading || !self.has_more() {
            return false;
        }
        self.is_loading = true;
        true
    }

    /// Finish the in-flight page and return the newly revealed items
    pub fn complete_load(&mut self) -> &[T] {
        if !self.is_loading {
            return &[];
        }
        self.is_loading = false;

        let start = self.displayed;
        let end = (start + self.page_size).min(self.items.len());
        if end > start {
            self.displayed = end;
            self.current_page += 1;
        }

        debug!(
            page = self.current_page,
            displayed = self.displayed,
            total = self.items.len(),
            "Feed page loaded"
        );

        &self.items[start..end]
    }

    /// Whether a scroll position is close enough to the end to fetch more
    pub fn should_load_more(&self, scroll_top: f64, viewport_height: f64, document_height: f64) -> bool {
        !self.is_loading
            && self.has_more()
            && viewport_height + scroll_top >= document_height - LOAD_MORE_MARGIN
    }

    /// Items revealed so far
    pub fn displayed(&self) -> &[T] {
        &self.items[..self.displayed]
    }

    pub fn has_more(&self) -> bool {
        self.displayed < self.items.len()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn status(&self) -> FeedStatus {
        FeedStatus {
            displayed: self.displayed,
            total: self.items.len(),
            has_more: self.has_more(),
            is_loading: self.is_loading,
        }
    }
}
