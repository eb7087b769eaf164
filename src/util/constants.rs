// Fiches - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every bound on a growing collection or user-supplied value lives here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "Fiches";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "Fiches";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Filtering and debounce
// =============================================================================

/// Quiescence window in milliseconds before a filter dimension settles.
pub const DEFAULT_FILTER_DEBOUNCE_MS: u64 = 300;

/// Maximum user-configurable debounce window (ms).
/// Zero is allowed and means every change settles on the next tick.
pub const MAX_FILTER_DEBOUNCE_MS: u64 = 5_000;

/// Maximum number of tags that can be selected at once.
pub const MAX_SELECTED_TAGS: usize = 10;

/// Maximum length of a single tag, in characters.
pub const MAX_TAG_LENGTH: usize = 50;

/// Maximum length of the free-text search box, in characters.
/// Longer input is truncated rather than rejected.
pub const MAX_SEARCH_TEXT_LENGTH: usize = 200;

/// Maximum number of autocomplete suggestions offered for the tag buffer.
pub const MAX_TAG_SUGGESTIONS: usize = 8;

// =============================================================================
// Recent window and pagination
// =============================================================================

/// Fixed page size for every backend search request.
pub const PAGE_SIZE: u32 = 20;

/// Length of the pre-loaded "recent window" in days.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Hard upper bound on the number of files held in the accumulated list.
///
/// "Load more" is refused once the list reaches this size. At a few hundred
/// bytes per record this keeps the in-memory list well under 10 MB.
pub const MAX_ACCUMULATED_ITEMS: usize = 10_000;

/// Maximum number of fetch results applied by a single `tick`.
/// Remaining results stay in the channel for the next tick.
pub const MAX_FETCH_MESSAGES_PER_TICK: usize = 64;

// =============================================================================
// Notifications
// =============================================================================

/// Lifetime of the "filters restored" notice (ms).
pub const RESTORED_NOTICE_MS: u64 = 3_000;

// =============================================================================
// HTTP
// =============================================================================

/// Default base URL of the files API.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default global timeout for a single HTTP request (seconds).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Minimum user-configurable HTTP timeout (seconds).
pub const MIN_HTTP_TIMEOUT_SECS: u64 = 1;

/// Maximum user-configurable HTTP timeout (seconds).
pub const MAX_HTTP_TIMEOUT_SECS: u64 = 120;

/// How long the CLI waits for outstanding fetches before giving up (seconds).
pub const CLI_FETCH_WAIT_SECS: u64 = 60;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration and persistence
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Versioned storage key for persisted filters. Bump the suffix when the
/// persisted shape changes incompatibly; old keys are then simply ignored.
pub const PERSISTED_FILTERS_KEY: &str = "mes-fiches-filters-v1";
