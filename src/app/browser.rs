// Fiches - app/browser.rs
//
// The file browser: owner of the filter store, the debounce coalescer, the
// fetch manager and the accumulated result list. It is the only place where
// filter state or the list are mutated.
//
// Driving model:
//   - The caller feeds user input through the setters, passing `now`.
//   - The caller calls `tick(now)` from its main loop. A tick first applies
//     finished fetches (bounded per tick), then commits dimensions whose
//     debounce window elapsed.
//   - Each settle bumps `generation`. Search results tagged with an older
//     generation are discarded, so the last settle always wins regardless of
//     the order in which responses arrive.
//   - Count, recent-window and tag fetches are issued once at mount and are
//     not tied to a generation.

use crate::app::backend::FilesBackend;
use crate::app::fetch::{FetchManager, FetchOutcome, FetchRequest, FetchResult};
use crate::app::persistence::PersistenceAdapter;
use crate::app::store::FilterStore;
use crate::core::accumulator::PageAccumulator;
use crate::core::debounce::FilterDebouncer;
use crate::core::filter::{suggest_tags, FilterState, SettledFilterState};
use crate::core::model::{
    AccountTier, ClassLevel, Domain, PageWindow, ResultItem, SearchPage, TimeRange,
};
use crate::core::planner::{plan, FetchPlan, SearchQuery};
use crate::util::constants::{
    DEFAULT_FILTER_DEBOUNCE_MS, MAX_ACCUMULATED_ITEMS, MAX_FETCH_MESSAGES_PER_TICK,
    MAX_TAG_SUGGESTIONS, PAGE_SIZE, RESTORED_NOTICE_MS,
};
use crate::util::error::BackendError;
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Options and states
// =============================================================================

/// Construction-time settings of a browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub page_size: u32,
    /// Restrict every request to active files.
    pub active_only: bool,
    /// Quiescence window of each filter dimension.
    pub debounce: Duration,
    pub tier: AccountTier,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            active_only: true,
            debounce: Duration::from_millis(DEFAULT_FILTER_DEBOUNCE_MS),
            tier: AccountTier::default(),
        }
    }
}

/// Lifecycle of a fetch issued once at mount.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    NotLoaded,
    Loading,
    Loaded(T),
    Failed(BackendError),
}

impl<T> LoadState<T> {
    /// True once the fetch finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        matches!(self, LoadState::Loaded(_) | LoadState::Failed(_))
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// A failed search, kept so that `retry` can re-issue exactly the same
/// request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
    pub query: SearchQuery,
    pub error: BackendError,
}

// =============================================================================
// FileBrowser
// =============================================================================

pub struct FileBrowser {
    store: FilterStore,
    debouncer: FilterDebouncer,
    fetcher: FetchManager,
    results: PageAccumulator,
    options: BrowserOptions,

    mounted: bool,
    generation: u64,

    /// Query of the last page merged for the current generation. None until
    /// page 1 of the current filters is in the list; "load more" derives
    /// from it.
    merged_query: Option<SearchQuery>,
    /// Search of the current generation awaiting its response.
    search_in_flight: Option<SearchQuery>,
    /// True while the list shows the pre-loaded recent window.
    showing_recent: bool,
    failure: Option<SearchFailure>,

    recent: LoadState<Vec<ResultItem>>,
    count: LoadState<u64>,
    available_tags: Vec<String>,

    restored_notice_until: Option<Instant>,
}

impl FileBrowser {
    pub fn new(
        backend: Arc<dyn FilesBackend>,
        persistence: Box<dyn PersistenceAdapter>,
        options: BrowserOptions,
    ) -> Self {
        let store = FilterStore::new(persistence, options.tier);
        let debouncer = FilterDebouncer::new(store.state(), options.debounce);
        Self {
            store,
            debouncer,
            fetcher: FetchManager::new(backend, options.active_only),
            results: PageAccumulator::new(options.page_size),
            options,
            mounted: false,
            generation: 0,
            merged_query: None,
            search_in_flight: None,
            showing_recent: false,
            failure: None,
            recent: LoadState::NotLoaded,
            count: LoadState::NotLoaded,
            available_tags: Vec::new(),
            restored_notice_until: None,
        }
    }

    /// Restore persisted filters and start the initial fetches.
    ///
    /// The count and recent-window fetches run concurrently; the restored
    /// filters are planned right away, so a non-default restore issues its
    /// search without waiting for either.
    pub fn mount(&mut self, now: Instant) {
        if self.mounted {
            tracing::debug!("Browser already mounted");
            return;
        }
        self.mounted = true;

        if self.store.restore() {
            self.restored_notice_until = Some(now + Duration::from_millis(RESTORED_NOTICE_MS));
        }
        self.debouncer.reset(self.store.state());

        self.count = LoadState::Loading;
        self.recent = LoadState::Loading;
        self.fetcher.dispatch(self.generation, FetchRequest::Count);
        self.fetcher.dispatch(self.generation, FetchRequest::RecentWindow);
        self.fetcher.dispatch(self.generation, FetchRequest::AvailableTags);

        let settled = self.debouncer.settled();
        self.settle(settled);
    }

    // =========================================================================
    // Filter input
    // =========================================================================

    pub fn set_domain(&mut self, domain: Option<Domain>, now: Instant) {
        self.store.set_domain(domain);
        self.observe(now);
    }

    pub fn set_level(&mut self, level: Option<ClassLevel>, now: Instant) {
        self.store.set_level(level);
        self.observe(now);
    }

    pub fn set_time_range(&mut self, time_range: TimeRange, now: Instant) {
        self.store.set_time_range(time_range);
        self.observe(now);
    }

    pub fn add_tag(&mut self, tag: &str, now: Instant) -> bool {
        let added = self.store.add_tag(tag);
        self.observe(now);
        added
    }

    pub fn remove_tag(&mut self, tag: &str, now: Instant) -> bool {
        let removed = self.store.remove_tag(tag);
        self.observe(now);
        removed
    }

    pub fn set_search_text(&mut self, text: &str, now: Instant) {
        self.store.set_search_text(text);
        self.observe(now);
    }

    pub fn set_tag_input(&mut self, text: &str) {
        self.store.set_tag_input(text);
    }

    pub fn set_tier(&mut self, tier: AccountTier, now: Instant) {
        self.store.set_tier(tier);
        self.observe(now);
    }

    /// Reset every filter to its default and apply the result immediately.
    pub fn clear_filters(&mut self, now: Instant) {
        self.store.clear_all();
        self.observe(now);
        self.flush();
    }

    fn observe(&mut self, now: Instant) {
        self.debouncer.observe(self.store.state(), now);
    }

    // =========================================================================
    // Main loop
    // =========================================================================

    /// Apply finished fetches, then settle expired debounce windows.
    /// Returns true if anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        for outcome in self.fetcher.poll(MAX_FETCH_MESSAGES_PER_TICK) {
            changed |= self.apply_outcome(outcome);
        }

        if self.mounted {
            if let Some(settled) = self.debouncer.poll(now) {
                self.settle(settled);
                changed = true;
            }
        }

        if self.restored_notice_until.is_some_and(|until| now >= until) {
            self.restored_notice_until = None;
            changed = true;
        }

        changed
    }

    /// Commit every pending filter change now, skipping the debounce window.
    pub fn flush(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        match self.debouncer.flush() {
            Some(settled) => {
                self.settle(settled);
                true
            }
            None => false,
        }
    }

    /// Block until every dispatched fetch has been applied, or `timeout`
    /// elapses. Returns false on timeout.
    pub fn wait_for_fetches(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.fetcher.in_flight() > 0 {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    in_flight = self.fetcher.in_flight(),
                    "Timed out waiting for fetches"
                );
                return false;
            }
            if let Some(outcome) = self.fetcher.wait(deadline - now) {
                self.apply_outcome(outcome);
            }
        }
        true
    }

    /// Earliest instant at which `tick` has timed work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.debouncer.next_due(), self.restored_notice_until]
            .into_iter()
            .flatten()
            .min()
    }

    // =========================================================================
    // Pagination and recovery
    // =========================================================================

    /// True when `load_more` would issue a request.
    pub fn can_load_more(&self) -> bool {
        !self.showing_recent
            && self.search_in_flight.is_none()
            && self.merged_query.is_some()
            && self.results.has_more()
            && self.results.len() < MAX_ACCUMULATED_ITEMS
    }

    /// Request the page after the last merged one. Returns false when
    /// refused: on the fast path, while a search is in flight, before page 1
    /// of the current filters was merged, when nothing more is left and at
    /// the size bound. A failed page 1 is recovered with `retry` only.
    pub fn load_more(&mut self) -> bool {
        if !self.can_load_more() {
            if self.results.len() >= MAX_ACCUMULATED_ITEMS {
                tracing::warn!(
                    items = self.results.len(),
                    "Accumulated list is full, not loading more"
                );
            }
            return false;
        }
        let Some(query) = self.merged_query.as_ref().map(SearchQuery::next_page) else {
            return false;
        };
        self.failure = None;
        self.start_search(query);
        true
    }

    /// Re-issue the failed search, if any. Returns false when there is
    /// nothing to retry.
    pub fn retry(&mut self) -> bool {
        if self.search_in_flight.is_some() {
            return false;
        }
        match self.failure.take() {
            Some(failure) => {
                tracing::info!(page = failure.query.page, "Retrying search");
                self.start_search(failure.query);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn items(&self) -> &[ResultItem] {
        self.results.items()
    }

    pub fn window(&self) -> PageWindow {
        self.results.window()
    }

    /// Live filter values, as last edited.
    pub fn filters(&self) -> &FilterState {
        self.store.state()
    }

    /// Filter values the list currently answers.
    pub fn settled_filters(&self) -> SettledFilterState {
        self.debouncer.settled()
    }

    pub fn tag_input(&self) -> &str {
        self.store.tag_input()
    }

    pub fn tier(&self) -> AccountTier {
        self.store.tier()
    }

    /// True while any filter dimension is still inside its debounce window.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// True while a search of the current generation is awaited.
    pub fn is_searching(&self) -> bool {
        self.search_in_flight.is_some()
    }

    pub fn is_loading_more(&self) -> bool {
        self.search_in_flight.as_ref().is_some_and(|q| q.page > 1)
    }

    /// True once both the count and the recent window have finished.
    pub fn is_loaded(&self) -> bool {
        self.count.is_finished() && self.recent.is_finished()
    }

    pub fn is_showing_recent(&self) -> bool {
        self.showing_recent
    }

    pub fn failure(&self) -> Option<&SearchFailure> {
        self.failure.as_ref()
    }

    pub fn error(&self) -> Option<&BackendError> {
        self.failure.as_ref().map(|f| &f.error)
    }

    /// Total number of files owned by the user, once known.
    pub fn total_count(&self) -> Option<u64> {
        self.count.loaded().copied()
    }

    pub fn recent_window(&self) -> &LoadState<Vec<ResultItem>> {
        &self.recent
    }

    pub fn available_tags(&self) -> &[String] {
        &self.available_tags
    }

    /// Autocomplete suggestions for the current tag buffer.
    pub fn tag_suggestions(&self) -> Vec<String> {
        if !self.store.tier().allows_tag_filters() {
            return Vec::new();
        }
        suggest_tags(
            &self.available_tags,
            self.store.tag_input(),
            &self.store.state().tags,
            MAX_TAG_SUGGESTIONS,
        )
    }

    /// True while the "filters restored" notice should be shown.
    pub fn restored_notice(&self) -> bool {
        self.restored_notice_until.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Start a new generation for `settled` and fetch accordingly.
    fn settle(&mut self, settled: SettledFilterState) {
        self.generation += 1;
        self.failure = None;
        self.search_in_flight = None;
        self.merged_query = None;

        let recent_usable = !matches!(self.recent, LoadState::Failed(_));
        match plan(
            &settled,
            recent_usable,
            self.options.page_size,
            self.options.active_only,
        ) {
            FetchPlan::FastPath => {
                tracing::debug!(generation = self.generation, "Showing recent window");
                self.showing_recent = true;
                match &self.recent {
                    LoadState::Loaded(items) => self.results.show_recent(items),
                    _ => self.results.clear(),
                }
            }
            FetchPlan::Search(query) => {
                tracing::debug!(
                    generation = self.generation,
                    active_filters = settled.active_count(),
                    "Filters settled, searching"
                );
                self.showing_recent = false;
                self.start_search(query);
            }
        }
    }

    fn start_search(&mut self, query: SearchQuery) {
        self.search_in_flight = Some(query.clone());
        self.fetcher.dispatch(self.generation, FetchRequest::Search(query));
    }

    /// Apply one finished fetch. Returns true if the view changed.
    fn apply_outcome(&mut self, outcome: FetchOutcome) -> bool {
        match outcome.result {
            FetchResult::Search { query, result } => {
                self.apply_search(outcome.generation, query, result)
            }
            FetchResult::Count(result) => {
                self.count = match result {
                    Ok(total) => LoadState::Loaded(total),
                    Err(e) => LoadState::Failed(e),
                };
                true
            }
            FetchResult::RecentWindow(Ok(items)) => {
                if self.showing_recent {
                    self.results.show_recent(&items);
                }
                self.recent = LoadState::Loaded(items);
                true
            }
            FetchResult::RecentWindow(Err(e)) => {
                self.recent = LoadState::Failed(e);
                if self.showing_recent {
                    tracing::info!("Recent window unavailable, falling back to search");
                    let settled = self.debouncer.settled();
                    self.settle(settled);
                }
                true
            }
            FetchResult::AvailableTags(Ok(tags)) => {
                self.available_tags = tags;
                true
            }
            // Already logged by the worker; suggestions simply stay empty.
            FetchResult::AvailableTags(Err(_)) => false,
        }
    }

    fn apply_search(
        &mut self,
        generation: u64,
        query: SearchQuery,
        result: Result<SearchPage, BackendError>,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                page = query.page,
                "Discarding stale search result"
            );
            return false;
        }
        self.search_in_flight = None;

        match result {
            Ok(page) => {
                let reset = query.page <= 1;
                tracing::debug!(
                    page = page.page,
                    received = page.items.len(),
                    total_count = page.total_count,
                    reset,
                    "Merging search page"
                );
                self.results.apply(page, reset);
                self.merged_query = Some(query);
                self.failure = None;
            }
            Err(error) => {
                // Accumulated pages stay as they are.
                self.failure = Some(SearchFailure { query, error });
            }
        }
        true
    }
}
