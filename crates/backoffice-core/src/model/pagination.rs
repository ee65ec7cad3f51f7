// ── Pagination ──
//
// Server pagination descriptor plus the windowed page list shown under
// every list view: first, last, current±2, with a gap marker wherever
// two shown pages are not adjacent.

use serde::{Deserialize, Serialize};

/// Pages shown on each side of the current page.
const WINDOW_RADIUS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

/// One entry of the page bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(u32),
    Gap,
}

impl Pagination {
    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn window(&self) -> Vec<PageSlot> {
        page_window(self.current_page, self.last_page)
    }

    /// Page the list should show after `deleted` records disappear.
    ///
    /// The current page is kept unless it would now be past the end, in
    /// which case it clamps to the last non-empty page (never below 1).
    pub fn page_after_delete(&self, deleted: u64) -> u32 {
        if self.per_page == 0 {
            return self.current_page.max(1);
        }
        let remaining = self.total.saturating_sub(deleted);
        let last = remaining.div_ceil(u64::from(self.per_page)).max(1);
        let last = u32::try_from(last).unwrap_or(u32::MAX);
        self.current_page.clamp(1, last)
    }

    /// Account for a record added to or removed from the server-side set.
    pub(crate) fn adjust_total(&mut self, delta: i64) {
        self.total = self.total.saturating_add_signed(delta);
        if self.per_page > 0 {
            let last = self.total.div_ceil(u64::from(self.per_page)).max(1);
            self.last_page = u32::try_from(last).unwrap_or(u32::MAX);
        }
    }
}

/// Compute the page bar for `current` of `last`.
///
/// `page_window(7, 20)` is `1 … 5 6 7 8 9 … 20`. An empty result means
/// there is nothing to paginate.
pub fn page_window(current: u32, last: u32) -> Vec<PageSlot> {
    if last == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, last);
    let lo = current.saturating_sub(WINDOW_RADIUS).max(1);
    let hi = current.saturating_add(WINDOW_RADIUS).min(last);

    let mut pages: Vec<u32> = Vec::with_capacity(7);
    pages.push(1);
    pages.extend(lo..=hi);
    pages.push(last);
    pages.sort_unstable();
    pages.dedup();

    let mut slots = Vec::with_capacity(pages.len() + 2);
    let mut prev: Option<u32> = None;
    for page in pages {
        if prev.is_some_and(|p| page - p > 1) {
            slots.push(PageSlot::Gap);
        }
        slots.push(PageSlot::Page(page));
        prev = Some(page);
    }
    slots
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use super::PageSlot::{Gap, Page};

    fn meta(current_page: u32, per_page: u32, total: u64) -> Pagination {
        let last_page = u32::try_from(total.div_ceil(u64::from(per_page)).max(1)).unwrap_or(1);
        Pagination {
            current_page,
            last_page,
            per_page,
            total,
        }
    }

    #[test]
    fn window_in_the_middle_has_two_gaps() {
        assert_eq!(
            page_window(7, 20),
            vec![Page(1), Gap, Page(5), Page(6), Page(7), Page(8), Page(9), Gap, Page(20)]
        );
    }

    #[test]
    fn window_near_the_start_has_no_leading_gap() {
        assert_eq!(
            page_window(3, 20),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Gap, Page(20)]
        );
        // 1 and 2 are adjacent even though 2 only appears via current-2.
        assert_eq!(
            page_window(4, 20),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Page(6), Gap, Page(20)]
        );
    }

    #[test]
    fn window_near_the_end() {
        assert_eq!(
            page_window(19, 20),
            vec![Page(1), Gap, Page(17), Page(18), Page(19), Page(20)]
        );
    }

    #[test]
    fn tiny_and_empty_ranges() {
        assert_eq!(page_window(1, 1), vec![Page(1)]);
        assert_eq!(page_window(2, 3), vec![Page(1), Page(2), Page(3)]);
        assert!(page_window(1, 0).is_empty());
        // Out-of-range current pages are clamped.
        assert_eq!(page_window(9, 2), vec![Page(1), Page(2)]);
    }

    #[test]
    fn prev_next_bounds() {
        let first = meta(1, 10, 30);
        assert!(!first.has_prev());
        assert!(first.has_next());
        let last = meta(3, 10, 30);
        assert!(last.has_prev());
        assert!(!last.has_next());
    }

    #[test]
    fn delete_keeps_page_unless_it_empties() {
        // Page 2 of 25 records: still three pages after one delete.
        assert_eq!(meta(2, 10, 25).page_after_delete(1), 2);
        // Last record on page 3 disappears: clamp to page 2.
        assert_eq!(meta(3, 10, 21).page_after_delete(1), 2);
        // Everything gone: page 1.
        assert_eq!(meta(1, 10, 1).page_after_delete(1), 1);
    }

    #[test]
    fn adjusting_total_recomputes_last_page() {
        let mut p = meta(1, 10, 20);
        p.adjust_total(1);
        assert_eq!((p.total, p.last_page), (21, 3));
        p.adjust_total(-2);
        assert_eq!((p.total, p.last_page), (19, 2));
    }
}
