// Fiches - app/fetch.rs
//
// Backend request lifecycle. Each request runs on its own short-lived
// background thread and reports back over an mpsc channel; the browser
// drains the channel from its tick.
//
// Architecture:
//   - `FetchManager` lives on the owning thread; `run_fetch` runs on a worker.
//   - Every request carries the settle generation that issued it. The manager
//     never filters on it: deciding what is stale is the browser's job.
//   - There is no hard cancellation. A superseded request runs to completion
//     and its result is discarded by the receiver.

use crate::app::backend::FilesBackend;
use crate::core::model::{RecentPeriod, ResultItem, SearchPage};
use crate::core::planner::SearchQuery;
use crate::util::error::BackendError;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

// =============================================================================
// Messages
// =============================================================================

/// A backend request the engine can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Search(SearchQuery),
    Count,
    /// The pre-loaded recent window (`by-period/week`).
    RecentWindow,
    AvailableTags,
}

impl FetchRequest {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            FetchRequest::Search(_) => "search",
            FetchRequest::Count => "count",
            FetchRequest::RecentWindow => "recent-window",
            FetchRequest::AvailableTags => "available-tags",
        }
    }
}

/// Result of a completed request, one variant per request kind.
#[derive(Debug, Clone)]
pub enum FetchResult {
    Search {
        query: SearchQuery,
        result: Result<SearchPage, BackendError>,
    },
    Count(Result<u64, BackendError>),
    RecentWindow(Result<Vec<ResultItem>, BackendError>),
    AvailableTags(Result<Vec<String>, BackendError>),
}

impl FetchResult {
    pub fn label(&self) -> &'static str {
        match self {
            FetchResult::Search { .. } => "search",
            FetchResult::Count(_) => "count",
            FetchResult::RecentWindow(_) => "recent-window",
            FetchResult::AvailableTags(_) => "available-tags",
        }
    }

    pub fn error(&self) -> Option<&BackendError> {
        match self {
            FetchResult::Search { result, .. } => result.as_ref().err(),
            FetchResult::Count(r) => r.as_ref().err(),
            FetchResult::RecentWindow(r) => r.as_ref().err(),
            FetchResult::AvailableTags(r) => r.as_ref().err(),
        }
    }
}

/// A completed request tagged with the generation that issued it.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub generation: u64,
    pub result: FetchResult,
}

// =============================================================================
// FetchManager
// =============================================================================

pub struct FetchManager {
    backend: Arc<dyn FilesBackend>,
    active_only: bool,
    tx: mpsc::Sender<FetchOutcome>,
    rx: mpsc::Receiver<FetchOutcome>,
    /// Requests dispatched whose outcome has not been received yet.
    in_flight: usize,
}

impl FetchManager {
    pub fn new(backend: Arc<dyn FilesBackend>, active_only: bool) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            active_only,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Start `request` on a background thread.
    pub fn dispatch(&mut self, generation: u64, request: FetchRequest) {
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let active_only = self.active_only;

        tracing::debug!(generation, request = request.label(), "Dispatching fetch");
        self.in_flight += 1;

        std::thread::spawn(move || {
            run_fetch(backend.as_ref(), generation, request, active_only, &tx);
        });
    }

    /// Collect up to `limit` completed outcomes without blocking.
    /// Anything beyond `limit` stays queued for the next call.
    pub fn poll(&mut self, limit: usize) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while outcomes.len() < limit {
            match self.rx.try_recv() {
                Ok(outcome) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    outcomes.push(outcome);
                }
                Err(_) => break,
            }
        }
        outcomes
    }

    /// Block for the next outcome, up to `timeout`.
    pub fn wait(&mut self, timeout: Duration) -> Option<FetchOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(outcome)
            }
            Err(_) => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Run one request and send its outcome. Runs on a background thread.
fn run_fetch(
    backend: &dyn FilesBackend,
    generation: u64,
    request: FetchRequest,
    active_only: bool,
    tx: &mpsc::Sender<FetchOutcome>,
) {
    let started = Instant::now();
    let result = match request {
        FetchRequest::Search(query) => {
            let result = backend.search(&query);
            FetchResult::Search { query, result }
        }
        FetchRequest::Count => FetchResult::Count(backend.count(active_only)),
        FetchRequest::RecentWindow => {
            FetchResult::RecentWindow(backend.list_by_period(RecentPeriod::Week, active_only))
        }
        FetchRequest::AvailableTags => {
            FetchResult::AvailableTags(backend.available_tags(active_only))
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result.error() {
        None => tracing::debug!(
            generation,
            request = result.label(),
            elapsed_ms,
            "Fetch completed"
        ),
        Some(e) => tracing::warn!(
            generation,
            request = result.label(),
            endpoint = e.endpoint(),
            elapsed_ms,
            error = %e,
            "Fetch failed"
        ),
    }

    // Receiver gone means the browser was dropped; nothing left to do.
    let _ = tx.send(FetchOutcome { generation, result });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::memory_backend::MemoryBackend;
    use chrono::{TimeZone, Utc};

    fn manager() -> FetchManager {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
        FetchManager::new(Arc::new(MemoryBackend::new(now)), true)
    }

    #[test]
    fn test_outcome_carries_generation() {
        let mut fetcher = manager();
        fetcher.dispatch(7, FetchRequest::Count);
        assert_eq!(fetcher.in_flight(), 1);

        let outcome = fetcher.wait(Duration::from_secs(5)).expect("count outcome");
        assert_eq!(outcome.generation, 7);
        assert!(matches!(outcome.result, FetchResult::Count(Ok(0))));
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[test]
    fn test_wait_with_nothing_in_flight_returns_immediately() {
        let mut fetcher = manager();
        assert!(fetcher.wait(Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_poll_respects_limit() {
        let mut fetcher = manager();
        for generation in 0..3 {
            fetcher.dispatch(generation, FetchRequest::AvailableTags);
        }
        // Let every worker finish before polling.
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut drained = Vec::new();
        while drained.len() < 1 && Instant::now() < deadline {
            drained.extend(fetcher.poll(1));
        }
        assert_eq!(drained.len(), 1);
        assert_eq!(fetcher.in_flight(), 2);
        while fetcher.in_flight() > 0 && Instant::now() < deadline {
            drained.extend(fetcher.poll(64));
        }
        assert_eq!(drained.len(), 3);
    }
}
