// Fiches - core/accumulator.rs
//
// Page accumulation: the single source of truth for the rendered file list.
//
// Every initial load, filtered search and "load more" goes through
// `merge_items`:
//   1. candidate = reset ? incoming : existing ++ incoming
//   2. dedup by file_id, last write wins (the entry keeps the position of
//      its first occurrence)
//   3. stable sort by created_at, newest first
//
// Merging the same page twice is therefore a no-op on ids, length and order.

use crate::core::model::{PageWindow, ResultItem, SearchPage};
use std::collections::HashMap;

/// Merge `incoming` into `existing` and return the new ordered list.
pub fn merge_items(existing: &[ResultItem], incoming: Vec<ResultItem>, reset: bool) -> Vec<ResultItem> {
    let mut candidate: Vec<ResultItem> = if reset {
        Vec::with_capacity(incoming.len())
    } else {
        let mut v = Vec::with_capacity(existing.len() + incoming.len());
        v.extend_from_slice(existing);
        v
    };
    candidate.extend(incoming);

    let mut merged = dedup_by_file_id(candidate);
    sort_newest_first(&mut merged);
    merged
}

/// Keep one entry per `file_id`; later entries overwrite earlier ones in place.
fn dedup_by_file_id(items: Vec<ResultItem>) -> Vec<ResultItem> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<ResultItem> = Vec::with_capacity(items.len());

    for item in items {
        match positions.get(&item.file_id) {
            Some(&pos) => out[pos] = item,
            None => {
                positions.insert(item.file_id.clone(), out.len());
                out.push(item);
            }
        }
    }
    out
}

/// Stable sort, newest first. Ties keep their current relative order, so
/// sorting an already sorted list never moves anything.
fn sort_newest_first(items: &mut [ResultItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

// =============================================================================
// PageAccumulator
// =============================================================================

/// Accumulated result list plus its pagination window.
#[derive(Debug, Clone)]
pub struct PageAccumulator {
    items: Vec<ResultItem>,
    window: PageWindow,
}

impl PageAccumulator {
    pub fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            window: PageWindow::empty(page_size),
        }
    }

    /// Merge a search page. `reset` replaces the list (page 1 of a new
    /// filter combination); otherwise the page is appended.
    pub fn apply(&mut self, page: SearchPage, reset: bool) {
        let page_number = if reset {
            page.page
        } else {
            // Re-applying an older page must not move the window backwards.
            page.page.max(self.window.page)
        };
        self.items = merge_items(&self.items, page.items, reset);

        let has_more =
            page_number < page.total_pages && (self.items.len() as u64) < page.total_count;
        self.window = PageWindow {
            page: page_number,
            page_size: self.window.page_size,
            total_count: page.total_count,
            total_pages: page.total_pages,
            has_more,
        };
    }

    /// Replace the list with the pre-loaded recent window.
    ///
    /// The recent window is a single, complete page: nothing more to load.
    pub fn show_recent(&mut self, recent: &[ResultItem]) {
        self.items = merge_items(&[], recent.to_vec(), true);
        self.window = PageWindow {
            page: 1,
            page_size: self.window.page_size,
            total_count: self.items.len() as u64,
            total_pages: u32::from(!self.items.is_empty()),
            has_more: false,
        };
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.window = PageWindow::empty(self.window.page_size);
    }

    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    pub fn has_more(&self) -> bool {
        self.window.has_more
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;

    fn item(id: &str, minutes_ago: i64) -> ResultItem {
        let base = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        ResultItem {
            file_id: id.to_string(),
            created_at: base - Duration::minutes(minutes_ago),
            title: Some(format!("Fiche {id}")),
            filename: None,
            domain: Some("math".to_string()),
            level: Some("CE1".to_string()),
            tags: Vec::new(),
            download_count: 0,
        }
    }

    fn page(ids: &[(&str, i64)], page: u32, total_count: u64, total_pages: u32) -> SearchPage {
        SearchPage {
            items: ids.iter().map(|(id, ago)| item(id, *ago)).collect(),
            page,
            total_count,
            total_pages,
            has_more: page < total_pages,
        }
    }

    fn assert_sorted(items: &[ResultItem]) {
        for pair in items.windows(2) {
            assert!(
                pair[0].created_at >= pair[1].created_at,
                "{} before {} breaks newest-first order",
                pair[0].file_id,
                pair[1].file_id
            );
        }
    }

    fn ids(items: &[ResultItem]) -> Vec<&str> {
        items.iter().map(|i| i.file_id.as_str()).collect()
    }

    #[test]
    fn test_merge_sorts_newest_first() {
        let merged = merge_items(&[], vec![item("a", 30), item("b", 5), item("c", 60)], true);
        assert_eq!(ids(&merged), vec!["b", "a", "c"]);
        assert_sorted(&merged);
    }

    #[test]
    fn test_merge_twice_is_idempotent() {
        let p = page(&[("a", 1), ("b", 2), ("c", 3)], 1, 3, 1);
        let mut acc = PageAccumulator::new(20);
        acc.apply(p.clone(), true);
        let once: Vec<String> = acc.items().iter().map(|i| i.file_id.clone()).collect();
        acc.apply(p, false);
        let twice: Vec<String> = acc.items().iter().map(|i| i.file_id.clone()).collect();
        assert_eq!(once, twice);
        assert_eq!(acc.len(), 3);
    }

    #[test]
    fn test_dedup_last_write_wins_in_place() {
        let existing = vec![item("a", 1), item("b", 2)];
        let mut newer_b = item("b", 2);
        newer_b.download_count = 7;
        let merged = merge_items(&existing, vec![newer_b], false);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].file_id, "b");
        assert_eq!(merged[1].download_count, 7);
    }

    #[test]
    fn test_ties_are_stable_across_sorts() {
        let tied = vec![item("x", 10), item("y", 10), item("z", 10)];
        let first = merge_items(&[], tied, true);
        let again = merge_items(&first, Vec::new(), false);
        assert_eq!(ids(&first), ids(&again));
    }

    #[test]
    fn test_reset_discards_existing() {
        let mut acc = PageAccumulator::new(20);
        acc.apply(page(&[("a", 1), ("b", 2)], 1, 2, 1), true);
        acc.apply(page(&[("c", 3)], 1, 1, 1), true);
        assert_eq!(ids(acc.items()), vec!["c"]);
        assert_eq!(acc.window().page, 1);
    }

    #[test]
    fn test_three_pages_exhaust_has_more() {
        let mut acc = PageAccumulator::new(2);
        acc.apply(page(&[("a", 1), ("b", 2)], 1, 5, 3), true);
        assert!(acc.has_more());
        // Page 2 overlaps page 1 on "b" (list shifted server-side).
        acc.apply(page(&[("b", 2), ("c", 3)], 2, 5, 3), false);
        assert!(acc.has_more());
        acc.apply(page(&[("d", 4), ("e", 5)], 3, 5, 3), false);

        let unique: HashSet<&str> = ids(acc.items()).into_iter().collect();
        assert_eq!(acc.len(), unique.len());
        assert_eq!(acc.len(), 5);
        assert!(!acc.has_more());
        assert_eq!(acc.window().page, 3);
        assert_sorted(acc.items());
    }

    #[test]
    fn test_reapplying_old_page_keeps_window() {
        let mut acc = PageAccumulator::new(1);
        acc.apply(page(&[("a", 1)], 1, 3, 3), true);
        acc.apply(page(&[("b", 2)], 2, 3, 3), false);
        acc.apply(page(&[("a", 1)], 1, 3, 3), false);
        assert_eq!(acc.window().page, 2);
        assert!(acc.has_more());
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_has_more_false_when_total_reached() {
        let mut acc = PageAccumulator::new(2);
        // Server claims more pages but every file is already here.
        acc.apply(page(&[("a", 1), ("b", 2)], 1, 2, 2), true);
        assert!(!acc.has_more());
    }

    #[test]
    fn test_show_recent_window() {
        let mut acc = PageAccumulator::new(20);
        acc.show_recent(&[item("old", 90), item("new", 1), item("new", 1)]);
        assert_eq!(ids(acc.items()), vec!["new", "old"]);
        let w = acc.window();
        assert_eq!((w.page, w.total_pages, w.total_count), (1, 1, 2));
        assert!(!w.has_more);

        acc.show_recent(&[]);
        assert!(acc.is_empty());
        assert_eq!(acc.window().total_pages, 0);
    }
}
