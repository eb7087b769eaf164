// Fiches - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no UI,
// no platform dependencies.
//
// These types are the shared vocabulary across all layers.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::util::constants::RECENT_WINDOW_DAYS;

// =============================================================================
// Filter dimensions
// =============================================================================

/// Subject domain of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Math,
    Francais,
    Lecture,
}

impl Domain {
    /// Returns all variants in display order.
    pub fn all() -> &'static [Domain] {
        &[Domain::Math, Domain::Francais, Domain::Lecture]
    }

    /// Wire identifier, as sent in `exercice_domain`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Math => "math",
            Domain::Francais => "francais",
            Domain::Lecture => "lecture",
        }
    }

    /// Case-insensitive parse of a wire identifier.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// School class level (French primary cycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassLevel {
    #[serde(rename = "CP")]
    Cp,
    #[serde(rename = "CE1")]
    Ce1,
    #[serde(rename = "CE2")]
    Ce2,
    #[serde(rename = "CM1")]
    Cm1,
    #[serde(rename = "CM2")]
    Cm2,
}

impl ClassLevel {
    /// Returns all variants from youngest to oldest.
    pub fn all() -> &'static [ClassLevel] {
        &[
            ClassLevel::Cp,
            ClassLevel::Ce1,
            ClassLevel::Ce2,
            ClassLevel::Cm1,
            ClassLevel::Cm2,
        ]
    }

    /// Wire identifier, as sent in `class_level`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLevel::Cp => "CP",
            ClassLevel::Ce1 => "CE1",
            ClassLevel::Ce2 => "CE2",
            ClassLevel::Cm1 => "CM1",
            ClassLevel::Cm2 => "CM2",
        }
    }

    /// Case-insensitive parse of a wire identifier.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|l| l.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for ClassLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creation-time window applied to the file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "today")]
    Today,
    #[default]
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "unlimited")]
    Unlimited,
}

impl TimeRange {
    /// Returns all variants from narrowest to widest.
    pub fn all() -> &'static [TimeRange] {
        &[
            TimeRange::Today,
            TimeRange::Week,
            TimeRange::Month,
            TimeRange::ThreeMonths,
            TimeRange::Unlimited,
        ]
    }

    /// Wire identifier, as sent in `time_period`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Today => "today",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::ThreeMonths => "3months",
            TimeRange::Unlimited => "unlimited",
        }
    }

    /// Case-insensitive parse of a wire identifier.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(value))
    }

    /// Oldest creation time still inside this range, relative to `now`.
    ///
    /// `Today` starts at UTC midnight. `None` means no lower bound.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| Utc.from_utc_datetime(&midnight)),
            TimeRange::Week => Some(now - Duration::days(RECENT_WINDOW_DAYS)),
            TimeRange::Month => Some(now - Duration::days(30)),
            TimeRange::ThreeMonths => Some(now - Duration::days(90)),
            TimeRange::Unlimited => None,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Account tier
// =============================================================================

/// Account entitlement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountTier {
    /// Most restricted tier: recent week only, no tag filters.
    #[default]
    Free,
    Standard,
    Premium,
}

impl AccountTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountTier::Free => "free",
            AccountTier::Standard => "standard",
            AccountTier::Premium => "premium",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Some(AccountTier::Free),
            "standard" => Some(AccountTier::Standard),
            "premium" => Some(AccountTier::Premium),
            _ => None,
        }
    }

    /// True for the tier whose time range is pinned to `week`.
    pub fn is_restricted(&self) -> bool {
        matches!(self, AccountTier::Free)
    }

    /// Whether tag filters may be added for this tier.
    pub fn allows_tag_filters(&self) -> bool {
        !self.is_restricted()
    }
}

impl std::fmt::Display for AccountTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Period accepted by the `by-period` listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecentPeriod {
    Week,
    All,
}

impl RecentPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecentPeriod::Week => "week",
            RecentPeriod::All => "all",
        }
    }
}

// =============================================================================
// Result records
// =============================================================================

/// A generated file record, validated at the backend boundary.
///
/// `file_id` is the identity key: the accumulated list never holds two
/// records with the same id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultItem {
    /// Unique, backend-assigned identifier.
    pub file_id: String,

    /// Creation time in UTC; the list is ordered on this, newest first.
    pub created_at: DateTime<Utc>,

    /// User-facing name (`custom_name` on the wire).
    pub title: Option<String>,

    /// Stored filename, shown when no title is set.
    pub filename: Option<String>,

    /// Domain as reported by the backend. Kept as a string so that records
    /// from domains this client does not know about are still listed.
    pub domain: Option<String>,

    /// Class level as reported by the backend.
    pub level: Option<String>,

    /// Tags attached to the file.
    pub tags: Vec<String>,

    /// Number of times the file was downloaded.
    pub download_count: u64,
}

impl ResultItem {
    /// Best available display name.
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.filename.as_deref())
            .unwrap_or(&self.file_id)
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| same_tag(t, tag))
    }
}

/// Tag equality under Unicode lowercase folding, so "Géométrie" and
/// "GÉOMÉTRIE" name the same tag.
pub fn same_tag(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// One page of search results as returned by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub items: Vec<ResultItem>,
    /// 1-based page number this page answers.
    pub page: u32,
    /// Total number of matching files on the server.
    pub total_count: u64,
    /// Total number of pages on the server.
    pub total_pages: u32,
    /// Server-side `has_more` flag, kept for diagnostics only; the client
    /// derives its own flag from `page`/`total_pages`.
    pub has_more: bool,
}

/// Pagination state of the accumulated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Highest page merged so far (0 before the first page).
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
    pub has_more: bool,
}

impl PageWindow {
    /// Window before any page has been merged.
    pub fn empty(page_size: u32) -> Self {
        Self {
            page: 0,
            page_size,
            total_count: 0,
            total_pages: 0,
            has_more: false,
        }
    }
}
