//! Page arithmetic for browse and submission listings
//!
//! Out-of-range page numbers are clamped rather than rejected: anything
//! below 1 shows the first page, anything past the end shows the last.

use serde::{Deserialize, Serialize};

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Resolved position of a page inside a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub offset: u64,
}

impl PageWindow {
    /// Clamp `requested` into `1..=total_pages`; an empty result has one page.
    pub fn resolve(requested: u32, per_page: u32, total_items: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_items.div_ceil(per_page as u64).max(1) as u32;
        let page = requested.clamp(1, total_pages);
        let offset = (page as u64 - 1) * per_page as u64;

        Self {
            page,
            per_page,
            total_pages,
            offset,
        }
    }

    pub fn into_page<T>(self, items: Vec<T>, total_items: u64) -> Page<T> {
        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total_items,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_basic() {
        let w = PageWindow::resolve(2, 12, 30);
        assert_eq!(w.page, 2);
        assert_eq!(w.total_pages, 3);
        assert_eq!(w.offset, 12);
    }

    #[test]
    fn test_resolve_clamps() {
        assert_eq!(PageWindow::resolve(0, 12, 30).page, 1);
        assert_eq!(PageWindow::resolve(99, 12, 30).page, 3);
        let empty = PageWindow::resolve(5, 12, 0);
        assert_eq!((empty.page, empty.total_pages, empty.offset), (1, 1, 0));
    }

    #[test]
    fn test_page_navigation() {
        let page = PageWindow::resolve(1, 12, 13).into_page(vec![1, 2], 13);
        assert!(page.has_next());
        assert!(!page.has_previous());
        let doubled = page.map(|x| x * 2);
        assert_eq!(doubled.items, vec![2, 4]);
    }
}
