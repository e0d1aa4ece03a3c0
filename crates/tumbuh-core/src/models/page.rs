use serde::{Deserialize, Serialize};

/// Upper bound on page size accepted from callers
pub const MAX_PER_PAGE: usize = 500;

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    /// Build a request, clamping page to at least 1 and per_page to `[1, MAX_PER_PAGE]`
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page: page.max(1), per_page: per_page.clamp(1, MAX_PER_PAGE) }
    }

    /// Request covering every item
    pub fn all() -> Self {
        Self { page: 1, per_page: usize::MAX }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Slice an already ordered collection
    pub fn apply<T: Clone>(&self, items: &[T]) -> Page<T> {
        let start = self.offset().min(items.len());
        let end = start.saturating_add(self.per_page).min(items.len());
        Page {
            items: items[start..end].to_vec(),
            page: self.page,
            per_page: self.per_page,
            total: items.len(),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 100)
    }
}

/// One page of an ordered collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_slices_pages() {
        let items: Vec<u32> = (0..7).collect();
        let page = PageRequest::new(2, 3).apply(&items);
        assert_eq!(page.items, vec![3, 4, 5]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn test_apply_past_end_is_empty() {
        let items = vec![1, 2];
        let page = PageRequest::new(5, 10).apply(&items);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_request_clamps() {
        let req = PageRequest::new(0, 0);
        assert_eq!(req, PageRequest { page: 1, per_page: 1 });
        assert_eq!(PageRequest::new(1, 10_000).per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::all().apply(&[1, 2, 3]).items.len(), 3);
    }

    proptest::proptest! {
        #[test]
        fn prop_pages_partition_items(len in 0usize..200, per_page in 1usize..50) {
            let items: Vec<usize> = (0..len).collect();
            let pages = len.div_ceil(per_page).max(1);

            let mut seen = Vec::new();
            for page in 1..=pages {
                let slice = PageRequest::new(page, per_page).apply(&items);
                proptest::prop_assert!(slice.items.len() <= per_page);
                proptest::prop_assert_eq!(slice.total, len);
                seen.extend(slice.items);
            }
            proptest::prop_assert_eq!(seen, items);
        }
    }
}
