// Fiches - core/filter.rs
//
// Filter state for the file list.
// All active dimensions are AND-combined by the backend; this module only
// holds and normalises the values.
// Core layer: pure logic, no I/O or UI dependencies.

use crate::core::model::{same_tag, AccountTier, ClassLevel, Domain, TimeRange};
use crate::util::constants::{MAX_SEARCH_TEXT_LENGTH, MAX_SELECTED_TAGS, MAX_TAG_LENGTH};
use std::ops::Deref;

// =============================================================================
// TagSet
// =============================================================================

/// Insertion-ordered, case-insensitive set of tags.
///
/// The first spelling of a tag wins: adding "Addition" after "addition" is
/// a no-op and the stored value stays "addition".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. Returns true if the set changed.
    ///
    /// The tag is trimmed first; empty, over-long, duplicate tags and tags
    /// beyond `MAX_SELECTED_TAGS` are rejected.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || tag.chars().count() > MAX_TAG_LENGTH {
            return false;
        }
        if self.contains(tag) || self.tags.len() >= MAX_SELECTED_TAGS {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag, matched case-insensitively. Returns true if it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        let before = self.tags.len();
        self.tags.retain(|t| !same_tag(t, tag));
        self.tags.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.tags.iter().any(|t| same_tag(t, tag))
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.tags.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag.as_ref());
        }
        set
    }
}

// =============================================================================
// FilterState
// =============================================================================

/// Complete filter state. All fields are AND-combined when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Subject domain (None = all).
    pub domain: Option<Domain>,

    /// Class level (None = all).
    pub level: Option<ClassLevel>,

    /// Creation-time window. Defaults to `week`.
    pub time_range: TimeRange,

    /// Selected tags; a file must carry every one of them.
    pub tags: TagSet,

    /// Free-text search on the file name. Empty = no filter.
    pub search_text: String,
}

impl FilterState {
    /// Returns true if every dimension holds its documented default.
    pub fn is_default(&self) -> bool {
        self.domain.is_none()
            && self.level.is_none()
            && self.time_range == TimeRange::default()
            && self.tags.is_empty()
            && self.search_text.trim().is_empty()
    }

    /// Number of dimensions that differ from their default.
    pub fn active_count(&self) -> usize {
        [
            self.domain.is_some(),
            self.level.is_some(),
            self.time_range != TimeRange::default(),
            !self.tags.is_empty(),
            !self.search_text.trim().is_empty(),
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }

    /// Apply the account tier's constraints. Returns true if anything changed.
    ///
    /// The restricted tier is pinned to `week` and carries no tag filters.
    pub fn enforce_tier(&mut self, tier: AccountTier) -> bool {
        let mut changed = false;
        if tier.is_restricted() && self.time_range != TimeRange::Week {
            tracing::debug!(
                requested = %self.time_range,
                tier = %tier,
                "Time range clamped to week for restricted tier"
            );
            self.time_range = TimeRange::Week;
            changed = true;
        }
        if !tier.allows_tag_filters() && !self.tags.is_empty() {
            self.tags.clear();
            changed = true;
        }
        changed
    }
}

/// Cap free-text search input at `MAX_SEARCH_TEXT_LENGTH` characters.
pub fn clamp_search_text(text: &str) -> String {
    text.chars().take(MAX_SEARCH_TEXT_LENGTH).collect()
}

// =============================================================================
// SettledFilterState
// =============================================================================

/// Debounced snapshot of `FilterState`.
///
/// Only the debounce coalescer produces these, so a value of this type is
/// always one the user stopped editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettledFilterState(FilterState);

impl SettledFilterState {
    pub(crate) fn new(state: FilterState) -> Self {
        Self(state)
    }

    pub fn into_inner(self) -> FilterState {
        self.0
    }
}

impl Deref for SettledFilterState {
    type Target = FilterState;

    fn deref(&self) -> &FilterState {
        &self.0
    }
}

// =============================================================================
// Tag autocomplete
// =============================================================================

/// Suggest tags for the autocomplete buffer.
///
/// Case-insensitive substring match against `available`, with prefix matches
/// ranked before inner matches; tags already in `selected` are skipped.
/// An empty buffer suggests nothing.
pub fn suggest_tags(
    available: &[String],
    buffer: &str,
    selected: &TagSet,
    limit: usize,
) -> Vec<String> {
    let needle = buffer.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut prefix = Vec::new();
    let mut inner = Vec::new();
    for tag in available {
        if selected.contains(tag) {
            continue;
        }
        let lower = tag.to_lowercase();
        if lower.starts_with(&needle) {
            prefix.push(tag.clone());
        } else if lower.contains(&needle) {
            inner.push(tag.clone());
        }
    }

    prefix.into_iter().chain(inner).take(limit).collect()
}
