//! Page-number pagination over an already-ordered record sequence.
//!
//! Slicing happens after caching: a single whole-set entry serves every
//! page of its filter.

use serde::Serialize;

/// One page sliced out of a full result sequence.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: usize,
}

/// Pagination block of the list response body.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub total_pages: u32,
    pub total_items: usize,
}

impl<T> Paged<T> {
    pub fn info(&self) -> PageInfo {
        PageInfo {
            page: self.page,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

/// Slice page `page` (1-based, clamped to ≥1) of `items`.
///
/// Page `k` holds exactly the records at `[(k-1)·size, k·size)`; the final
/// page may be partial and a page past the end is empty rather than an
/// error.
pub fn paginate<T: Clone>(items: &[T], page: u32, page_size: usize) -> Paged<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = (total_items.div_ceil(page_size)) as u32;

    let start = (page as usize - 1).saturating_mul(page_size);
    let slice = if start >= total_items {
        Vec::new()
    } else {
        items[start..(start + page_size).min(total_items)].to_vec()
    };

    Paged {
        items: slice,
        page,
        total_pages,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn every_page_covers_its_half_open_range() {
        let items = sequence(23);
        for page in 1..=3u32 {
            let paged = paginate(&items, page, 10);
            let start = (page as usize - 1) * 10;
            let expected: Vec<usize> = (start..(start + 10).min(23)).collect();
            assert_eq!(paged.items, expected);
            assert_eq!(paged.total_pages, 3);
            assert_eq!(paged.total_items, 23);
        }
    }

    #[test]
    fn final_partial_page_has_no_off_by_one() {
        let paged = paginate(&sequence(23), 3, 10);
        assert_eq!(paged.items, vec![20, 21, 22]);
    }

    #[test]
    fn exact_multiple_produces_no_phantom_page() {
        let paged = paginate(&sequence(20), 2, 10);
        assert_eq!(paged.items.len(), 10);
        assert_eq!(paged.total_pages, 2);
        assert!(paginate(&sequence(20), 3, 10).items.is_empty());
    }

    #[test]
    fn page_zero_is_clamped_to_one() {
        let paged = paginate(&sequence(5), 0, 10);
        assert_eq!(paged.page, 1);
        assert_eq!(paged.items.len(), 5);
    }

    #[test]
    fn empty_sequence_yields_zero_pages() {
        let paged = paginate(&sequence(0), 1, 10);
        assert!(paged.items.is_empty());
        assert_eq!(paged.total_pages, 0);
        assert_eq!(paged.total_items, 0);
    }

    #[test]
    fn page_past_the_end_is_empty_not_an_error() {
        let paged = paginate(&sequence(5), 99, 10);
        assert!(paged.items.is_empty());
        assert_eq!(paged.total_pages, 1);
    }
}
