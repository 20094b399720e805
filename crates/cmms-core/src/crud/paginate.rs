// ── Client-side pagination ──

/// One page of a slice. Pages are 1-based.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<'_, T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Slice out page `page`, clamping it into `1..=total_pages`.
///
/// An empty input still has one (empty) page.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);

    Page {
        items: items.get(start..end).unwrap_or(&[]),
        page,
        per_page,
        total_items,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_slice_and_report_neighbours() {
        let items: Vec<u32> = (1..=25).collect();

        let first = paginate(&items, 1, 10);
        assert_eq!(first.items, &items[..10]);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next());
        assert!(!first.has_prev());

        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, &[21, 22, 23, 24, 25]);
        assert!(!last.has_next());
        assert!(last.has_prev());
    }

    #[test]
    fn out_of_range_pages_are_clamped() {
        let items = [1, 2, 3];
        assert_eq!(paginate(&items, 0, 2).page, 1);
        assert_eq!(paginate(&items, 9, 2).page, 2);
        assert_eq!(paginate(&items, 9, 2).items, &[3]);
    }

    #[test]
    fn empty_input_has_one_empty_page() {
        let items: [u8; 0] = [];
        let page = paginate(&items, 4, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.per_page, 1);
    }
}
