//! Offset pagination over a snapshot sequence.

use serde::Serialize;

/// Normalized 1-based page request. Build through
/// [`StoreConfig::page_request`](super::StoreConfig::page_request).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub(crate) fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Position of the first item on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Slice `items` to this page. Out-of-range pages yield an empty page.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset().min(items.len());
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }

    /// Collect one page from a filtered iterator while counting every match.
    pub fn collect<T, I>(&self, matches: I) -> Page<T>
    where
        I: IntoIterator<Item = T>,
    {
        let start = self.offset();
        let end = start.saturating_add(self.page_size);
        let mut items = Vec::with_capacity(self.page_size.min(64));
        let mut total = 0;

        for item in matches {
            if total >= start && total < end {
                items.push(item);
            }
            total += 1;
        }

        Page::new(items, total, *self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of matches across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_returns_requested_window() {
        let items: Vec<usize> = (0..25).collect();
        assert_eq!(PageRequest::new(2, 10).slice(&items), &items[10..20]);
        assert_eq!(PageRequest::new(3, 10).slice(&items), &items[20..25]);
        assert!(PageRequest::new(4, 10).slice(&items).is_empty());
    }

    #[test]
    fn collect_counts_all_matches() {
        let page = PageRequest::new(2, 3).collect((0..10).filter(|n| n % 2 == 0));
        assert_eq!(page.items, vec![6, 8]);
        assert_eq!(page.total, 5);
        assert!(!page.has_next());

        let first = PageRequest::new(1, 3).collect((0..10).filter(|n| n % 2 == 0));
        assert_eq!(first.items, vec![0, 2, 4]);
        assert!(first.has_next());
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let items = [1, 2, 3];
        let request = PageRequest::new(usize::MAX, usize::MAX);
        assert!(request.slice(&items).is_empty());
        assert!(request.collect(items).is_empty());
    }
}
