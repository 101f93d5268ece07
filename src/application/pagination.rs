//! Stateless page-slicing math shared by listings and the HTTP surface.

use serde::Serialize;

/// One page of a larger result set, with the counts needed to render
/// pagination controls. Pages are 1-based.
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_items: usize,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    /// Slice one page out of the full source. A zero page size or page
    /// number is clamped to 1; a page past the end yields an empty page
    /// with intact totals.
    pub fn slice(source: Vec<T>, page_size: u32, page_number: u32) -> Self {
        let page_size = page_size.max(1);
        let page_number = page_number.max(1);
        let total_items = source.len();
        let total_pages = total_items.div_ceil(page_size as usize) as u32;

        let start = (page_number as usize - 1).saturating_mul(page_size as usize);
        let items: Vec<T> = source
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Self {
            items,
            page_number,
            page_size,
            total_items,
            total_pages,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_number > 1 && self.total_pages > 0
    }

    pub fn next_page_number(&self) -> Option<u32> {
        self.has_next_page().then(|| self.page_number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u32> {
        self.has_previous_page().then(|| self.page_number - 1)
    }

    /// Replace the page items while keeping the paging bookkeeping. Used
    /// when summaries are resolved to full records after slicing (the
    /// replacement may be shorter when a dangling entry was dropped).
    pub fn with_items<U>(self, items: Vec<U>) -> PagedResult<U> {
        PagedResult {
            items,
            page_number: self.page_number,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
