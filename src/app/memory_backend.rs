// Fiches - app/memory_backend.rs
//
// In-memory implementation of the files API.
//
// Mirrors the server's observable behaviour: AND-combined filters, AND or OR
// tag matching, newest-first ordering and fixed-size pages. The clock is
// fixed at construction so time-range cutoffs are deterministic. Failures
// can be injected per endpoint to exercise the engine's error paths.

use crate::app::backend::FilesBackend;
use crate::core::model::{same_tag, RecentPeriod, ResultItem, SearchPage, TimeRange};
use crate::core::planner::SearchQuery;
use crate::util::error::BackendError;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct StoredFile {
    item: ResultItem,
    active: bool,
}

pub struct MemoryBackend {
    files: RwLock<Vec<StoredFile>>,
    now: DateTime<Utc>,
    search_calls: AtomicUsize,
    recent_calls: AtomicUsize,
    failing_searches: AtomicUsize,
    fail_recent: AtomicBool,
    fail_count: AtomicBool,
}

impl MemoryBackend {
    /// Empty backend whose clock reads `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            now,
            search_calls: AtomicUsize::new(0),
            recent_calls: AtomicUsize::new(0),
            failing_searches: AtomicUsize::new(0),
            fail_recent: AtomicBool::new(false),
            fail_count: AtomicBool::new(false),
        }
    }

    /// Backend pre-filled with active files.
    pub fn with_files(now: DateTime<Utc>, items: impl IntoIterator<Item = ResultItem>) -> Self {
        let backend = Self::new(now);
        for item in items {
            backend.insert(item, true);
        }
        backend
    }

    /// Add or replace a file (matched on `file_id`).
    pub fn insert(&self, item: ResultItem, active: bool) {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.retain(|f| f.item.file_id != item.file_id);
        files.push(StoredFile { item, active });
    }

    /// Make the next `n` search calls fail with HTTP 503.
    pub fn fail_next_searches(&self, n: usize) {
        self.failing_searches.store(n, Ordering::SeqCst);
    }

    /// Make every `by-period` call fail while `fail` is set.
    pub fn set_recent_failing(&self, fail: bool) {
        self.fail_recent.store(fail, Ordering::SeqCst);
    }

    /// Make every `count` call fail while `fail` is set.
    pub fn set_count_failing(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    /// Number of search calls received, failed ones included.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of `by-period` calls received.
    pub fn recent_calls(&self) -> usize {
        self.recent_calls.load(Ordering::SeqCst)
    }

    fn unavailable(endpoint: &str) -> BackendError {
        BackendError::Http {
            endpoint: endpoint.to_string(),
            status: 503,
        }
    }

    /// Files visible under `active_only`, newest first.
    fn visible(&self, active_only: bool) -> Vec<ResultItem> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let mut items: Vec<ResultItem> = files
            .iter()
            .filter(|f| f.active || !active_only)
            .map(|f| f.item.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    fn matches(&self, item: &ResultItem, query: &SearchQuery) -> bool {
        if let Some(domain) = query.domain {
            if !field_is(&item.domain, domain.as_str()) {
                return false;
            }
        }
        if let Some(level) = query.level {
            if !field_is(&item.level, level.as_str()) {
                return false;
            }
        }
        let cutoff = query
            .time_period
            .unwrap_or(TimeRange::Unlimited)
            .cutoff(self.now);
        if cutoff.is_some_and(|c| item.created_at < c) {
            return false;
        }
        if !query.tags.is_empty() {
            let match_all = query.match_all_tags.unwrap_or(false);
            let hit = if match_all {
                query.tags.iter().all(|t| item.has_tag(t))
            } else {
                query.tags.iter().any(|t| item.has_tag(t))
            };
            if !hit {
                return false;
            }
        }
        if let Some(needle) = &query.custom_name {
            let needle = needle.to_lowercase();
            let in_title = item
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle));
            let in_filename = item
                .filename
                .as_deref()
                .is_some_and(|f| f.to_lowercase().contains(&needle));
            if !in_title && !in_filename {
                return false;
            }
        }
        true
    }
}

fn field_is(field: &Option<String>, expected: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case(expected))
}

impl FilesBackend for MemoryBackend {
    fn search(&self, query: &SearchQuery) -> Result<SearchPage, BackendError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_searches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(Self::unavailable("search"));
        }

        let matching: Vec<ResultItem> = self
            .visible(query.active_only)
            .into_iter()
            .filter(|item| self.matches(item, query))
            .collect();

        let page_size = query.page_size.max(1) as usize;
        let total_count = matching.len() as u64;
        let total_pages = u32::try_from(matching.len().div_ceil(page_size)).unwrap_or(u32::MAX);
        let page = query.page.max(1);
        let start = (page as usize - 1).saturating_mul(page_size);
        let items: Vec<ResultItem> = matching.into_iter().skip(start).take(page_size).collect();

        Ok(SearchPage {
            items,
            page,
            total_count,
            total_pages,
            has_more: page < total_pages,
        })
    }

    fn count(&self, active_only: bool) -> Result<u64, BackendError> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(Self::unavailable("count"));
        }
        Ok(self.visible(active_only).len() as u64)
    }

    fn list_by_period(
        &self,
        period: RecentPeriod,
        active_only: bool,
    ) -> Result<Vec<ResultItem>, BackendError> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_recent.load(Ordering::SeqCst) {
            return Err(Self::unavailable("by-period"));
        }
        let cutoff = match period {
            RecentPeriod::Week => TimeRange::Week.cutoff(self.now),
            RecentPeriod::All => None,
        };
        Ok(self
            .visible(active_only)
            .into_iter()
            .filter(|item| cutoff.map_or(true, |c| item.created_at >= c))
            .collect())
    }

    fn available_tags(&self, active_only: bool) -> Result<Vec<String>, BackendError> {
        let mut tags: Vec<String> = Vec::new();
        for item in self.visible(active_only) {
            for tag in item.tags {
                if !tags.iter().any(|t| same_tag(t, &tag)) {
                    tags.push(tag);
                }
            }
        }
        tags.sort_by_key(|t| t.to_lowercase());
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::{FilterState, SettledFilterState};
    use crate::core::model::{ClassLevel, Domain};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap()
    }

    fn file(id: &str, days_ago: i64, domain: &str, level: &str, tags: &[&str]) -> ResultItem {
        ResultItem {
            file_id: id.to_string(),
            created_at: now() - Duration::days(days_ago),
            title: Some(format!("Fiche {id}")),
            filename: Some(format!("{id}.pdf")),
            domain: Some(domain.to_string()),
            level: Some(level.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            download_count: 0,
        }
    }

    fn query(state: FilterState) -> SearchQuery {
        SearchQuery::first_page(&SettledFilterState::new(state), 2, true)
    }

    fn backend() -> MemoryBackend {
        MemoryBackend::with_files(
            now(),
            [
                file("a", 1, "math", "CE1", &["addition", "soustraction"]),
                file("b", 2, "math", "CE1", &["addition"]),
                file("c", 3, "francais", "CP", &["lecture"]),
                file("d", 20, "math", "CE1", &["addition", "soustraction"]),
            ],
        )
    }

    #[test]
    fn test_tags_match_all() {
        let backend = backend();
        let page = backend
            .search(&query(FilterState {
                domain: Some(Domain::Math),
                level: Some(ClassLevel::Ce1),
                tags: ["addition", "soustraction"].into_iter().collect(),
                ..Default::default()
            }))
            .unwrap();
        let ids: Vec<&str> = page.items.iter().map(|i| i.file_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_accented_tags_match_case_insensitively() {
        let backend = backend();
        backend.insert(file("geo", 0, "math", "CM1", &["Géométrie"]), true);
        let page = backend
            .search(&query(FilterState {
                tags: ["GÉOMÉTRIE"].into_iter().collect(),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].file_id, "geo");
    }

    #[test]
    fn test_pagination() {
        let backend = backend();
        let q = query(FilterState {
            time_range: TimeRange::Unlimited,
            ..Default::default()
        });
        let p1 = backend.search(&q).unwrap();
        assert_eq!((p1.total_count, p1.total_pages, p1.items.len()), (4, 2, 2));
        assert!(p1.has_more);
        let p2_query = q.next_page();
        let p2 = backend.search(&p2_query).unwrap();
        assert_eq!(p2.items[1].file_id, "d");
        assert!(!p2.has_more);
        assert!(backend.search(&p2_query.next_page()).unwrap().items.is_empty());
        assert_eq!(backend.search_calls(), 3);
    }

    #[test]
    fn test_recent_window_and_inactive_files() {
        let backend = backend();
        backend.insert(file("hidden", 0, "math", "CP", &[]), false);
        let recent = backend.list_by_period(RecentPeriod::Week, true).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(backend.list_by_period(RecentPeriod::All, false).unwrap().len(), 5);
        assert_eq!(backend.count(true).unwrap(), 4);
    }

    #[test]
    fn test_injected_failures() {
        let backend = backend();
        backend.fail_next_searches(1);
        let q = query(FilterState::default());
        assert!(backend.search(&q).is_err());
        assert!(backend.search(&q).is_ok());
        backend.set_recent_failing(true);
        assert!(backend.list_by_period(RecentPeriod::Week, true).is_err());
    }

    #[test]
    fn test_available_tags_sorted_unique() {
        let tags = backend().available_tags(true).unwrap();
        assert_eq!(tags, vec!["addition", "lecture", "soustraction"]);
    }
}
