//! Fixed-size pagination for the stock and sales tables.

use serde::Serialize;

/// Rows per page on the stock table.
pub const STOCK_PAGE_SIZE: usize = 10;

/// Rows per page on the sales table.
pub const SALES_PAGE_SIZE: usize = 15;

/// One page of rows plus enough context to render "page 2 of 5".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page actually shown (requested page clamped into range).
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slices `items` into page `page` (1-based). Out-of-range pages clamp to
/// the nearest valid page; an empty list still has one (empty) page.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);

    Page {
        items: items.get(start..end).unwrap_or_default().to_vec(),
        page,
        total_pages,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_middle_and_last_page() {
        let rows: Vec<u32> = (1..=23).collect();

        let second = paginate(&rows, 2, 10);
        assert_eq!(second.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(second.total_pages, 3);

        let last = paginate(&rows, 3, 10);
        assert_eq!(last.items, vec![21, 22, 23]);
    }

    #[test]
    fn test_paginate_clamps_page() {
        let rows: Vec<u32> = (1..=5).collect();
        assert_eq!(paginate(&rows, 9, 10).page, 1);
        assert_eq!(paginate(&rows, 0, 10).items.len(), 5);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 1, 15);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }
}
