//! Offset pagination.

use serde::{Deserialize, Serialize};

/// A zero-based page request.
///
/// Page size is clamped to `1..=MAX_SIZE` so callers can pass raw query
/// parameters straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u32,
    /// Items per page.
    pub size: u32,
}

impl PageRequest {
    /// Default items per page.
    pub const DEFAULT_SIZE: u32 = 10;
    /// Largest page a caller may request.
    pub const MAX_SIZE: u32 = 100;

    /// Build a request from optional query parameters.
    #[must_use]
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size
                .unwrap_or(Self::DEFAULT_SIZE)
                .clamp(1, Self::MAX_SIZE),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    /// Rows to return.
    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Assemble a page from the rows of `request` and the overall row count.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total_items,
            total_pages: total_items.div_ceil(u64::from(request.size)),
        }
    }

    /// Convert every item, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        assert_eq!(PageRequest::default(), PageRequest { page: 0, size: 10 });
        assert_eq!(PageRequest::new(Some(2), Some(0)).size, 1);
        assert_eq!(PageRequest::new(None, Some(5_000)).size, 100);
    }

    #[test]
    fn test_offset() {
        let request = PageRequest::new(Some(3), Some(20));
        assert_eq!(request.offset(), 60);
        assert_eq!(request.limit(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page::new(vec![1, 2, 3], PageRequest::new(None, Some(3)), 7);
        assert_eq!(page.total_pages, 3);
        let empty: Page<u8> = Page::new(Vec::new(), PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], PageRequest::default(), 2).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total_items, 2);
    }
}
