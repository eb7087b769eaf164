// Fiches - app/backend.rs
//
// The files API as seen by the engine. Implementations live in
// `platform::http` (production) and `app::memory_backend` (tests, offline).
//
// Calls are blocking; the fetch manager runs each one on its own thread,
// hence the `Send + Sync` bound.

use crate::core::model::{RecentPeriod, ResultItem, SearchPage};
use crate::core::planner::SearchQuery;
use crate::util::error::BackendError;

pub trait FilesBackend: Send + Sync {
    /// `POST /files/{user}/search`
    fn search(&self, query: &SearchQuery) -> Result<SearchPage, BackendError>;

    /// `GET /files/{user}/count`
    fn count(&self, active_only: bool) -> Result<u64, BackendError>;

    /// `GET /files/{user}/by-period/{period}`
    fn list_by_period(
        &self,
        period: RecentPeriod,
        active_only: bool,
    ) -> Result<Vec<ResultItem>, BackendError>;

    /// `GET /files/{user}/available-tags`
    fn available_tags(&self, active_only: bool) -> Result<Vec<String>, BackendError>;
}
