// Fiches - app/store.rs
//
// Filter State Store: the live (undebounced) filter values, the tag
// autocomplete buffer and the active account tier.
//
// Every mutation goes through `commit`, which re-applies the tier clamp and
// then writes the persisted projection. Persistence runs on every change,
// independent of the debounce/query path; a failed write is logged and the
// store carries on.

use crate::app::persistence::PersistenceAdapter;
use crate::core::filter::{clamp_search_text, FilterState};
use crate::core::model::{AccountTier, ClassLevel, Domain, TimeRange};
use crate::core::persisted::PersistedFilters;
use crate::util::constants::MAX_TAG_LENGTH;

pub struct FilterStore {
    state: FilterState,
    tag_input: String,
    tier: AccountTier,
    persistence: Box<dyn PersistenceAdapter>,
    /// Last projection written successfully. Used to skip redundant writes.
    last_saved: Option<PersistedFilters>,
}

impl FilterStore {
    /// Create a store holding default filters. Nothing is read or written
    /// until `restore` or the first mutation.
    pub fn new(persistence: Box<dyn PersistenceAdapter>, tier: AccountTier) -> Self {
        Self {
            state: FilterState::default(),
            tag_input: String::new(),
            tier,
            persistence,
            last_saved: None,
        }
    }

    /// Load persisted filters, replacing the current state.
    ///
    /// Returns true when the restored filters differ from the defaults, i.e.
    /// when the user should be told their filters came back.
    pub fn restore(&mut self) -> bool {
        let loaded = self.persistence.load();
        self.last_saved = Some(loaded.clone());
        self.state = loaded.into_state();
        self.tag_input.clear();
        self.commit();

        let restored = !self.state.is_default();
        if restored {
            tracing::info!(
                active_filters = self.state.active_count(),
                "Restored persisted filters"
            );
        }
        restored
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn set_domain(&mut self, domain: Option<Domain>) {
        self.state.domain = domain;
        self.commit();
    }

    pub fn set_level(&mut self, level: Option<ClassLevel>) {
        self.state.level = level;
        self.commit();
    }

    /// Restricted tiers are put back to `week` by `commit`.
    pub fn set_time_range(&mut self, time_range: TimeRange) {
        self.state.time_range = time_range;
        self.commit();
    }

    /// Add a tag filter. Returns true if the tag set changed.
    ///
    /// A tier without tag filters makes this a silent no-op. On success the
    /// autocomplete buffer is cleared.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if !self.tier.allows_tag_filters() {
            tracing::debug!(tier = %self.tier, "Tag filter ignored for tier");
            return false;
        }
        if !self.state.tags.insert(tag) {
            return false;
        }
        self.tag_input.clear();
        self.commit();
        true
    }

    /// Remove a tag filter. Returns true if it was selected.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        if !self.state.tags.remove(tag) {
            return false;
        }
        self.commit();
        true
    }

    /// Input longer than the search limit is truncated.
    pub fn set_search_text(&mut self, text: &str) {
        self.state.search_text = clamp_search_text(text);
        self.commit();
    }

    /// Edit the autocomplete buffer. Not persisted, not a filter.
    pub fn set_tag_input(&mut self, text: &str) {
        self.tag_input = text.chars().take(MAX_TAG_LENGTH).collect();
    }

    /// Reset every dimension to its documented default.
    pub fn clear_all(&mut self) {
        self.state = FilterState::default();
        self.tag_input.clear();
        self.commit();
    }

    /// Switch account tier and re-apply its constraints immediately.
    pub fn set_tier(&mut self, tier: AccountTier) {
        if tier != self.tier {
            tracing::info!(from = %self.tier, to = %tier, "Account tier changed");
            self.tier = tier;
        }
        self.commit();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn tag_input(&self) -> &str {
        &self.tag_input
    }

    pub fn tier(&self) -> AccountTier {
        self.tier
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Enforce the tier clamp, then persist if the projection changed.
    fn commit(&mut self) {
        self.state.enforce_tier(self.tier);

        let projection = PersistedFilters::from_state(&self.state);
        if self.last_saved.as_ref() == Some(&projection) {
            return;
        }
        match self.persistence.save(&projection) {
            Ok(()) => self.last_saved = Some(projection),
            Err(e) => {
                // Losing persistence never blocks filtering.
                tracing::warn!(error = %e, "Failed to persist filters");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::persistence::MemoryPersistence;

    fn store_with(tier: AccountTier) -> (FilterStore, MemoryPersistence) {
        let storage = MemoryPersistence::new();
        let store = FilterStore::new(Box::new(storage.clone()), tier);
        (store, storage)
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let (mut store, storage) = store_with(AccountTier::Premium);
        store.set_domain(Some(Domain::Math));
        store.set_level(Some(ClassLevel::Ce2));
        store.add_tag("addition");
        store.set_search_text("tables");
        assert_eq!(storage.writes(), 4);

        let saved = storage.load();
        assert_eq!(saved.domain, Some(Domain::Math));
        assert_eq!(saved.level, Some(ClassLevel::Ce2));
        assert_eq!(saved.tags, vec!["addition".to_string()]);
        assert_eq!(saved.search_text, "tables");
    }

    #[test]
    fn test_unchanged_projection_is_not_rewritten() {
        let (mut store, storage) = store_with(AccountTier::Premium);
        store.set_domain(Some(Domain::Lecture));
        store.set_domain(Some(Domain::Lecture));
        store.set_tag_input("add");
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn test_restricted_tier_clamps_time_range() {
        let (mut store, _) = store_with(AccountTier::Free);
        for range in TimeRange::all() {
            store.set_time_range(*range);
            assert_eq!(store.state().time_range, TimeRange::Week);
        }
    }

    #[test]
    fn test_add_tag_outside_entitlement_is_noop() {
        let (mut store, storage) = store_with(AccountTier::Free);
        store.set_tag_input("addition");
        assert!(!store.add_tag("addition"));
        assert!(store.state().tags.is_empty());
        assert_eq!(store.tag_input(), "addition");
        assert_eq!(storage.writes(), 0);
    }

    #[test]
    fn test_add_tag_clears_buffer() {
        let (mut store, _) = store_with(AccountTier::Standard);
        store.set_tag_input("soustr");
        assert!(store.add_tag("soustraction"));
        assert_eq!(store.tag_input(), "");
        assert!(!store.add_tag("SOUSTRACTION"));
        assert!(store.remove_tag("Soustraction"));
        assert!(!store.remove_tag("soustraction"));
    }

    #[test]
    fn test_downgrade_reapplies_clamp() {
        let (mut store, storage) = store_with(AccountTier::Premium);
        store.set_time_range(TimeRange::Unlimited);
        store.add_tag("lecture");
        store.set_tier(AccountTier::Free);
        assert_eq!(store.state().time_range, TimeRange::Week);
        assert!(store.state().tags.is_empty());
        assert!(!storage.load().differs_from_default());
    }

    #[test]
    fn test_clear_all_resets_to_defaults() {
        let storage = MemoryPersistence::with_blob(r#"{"domain":"math","time_range":"month"}"#);
        let mut store = FilterStore::new(Box::new(storage.clone()), AccountTier::Premium);
        assert!(store.restore());
        store.set_tag_input("x");
        store.clear_all();
        assert!(store.state().is_default());
        assert_eq!(store.tag_input(), "");
        assert!(!storage.load().differs_from_default());
    }

    #[test]
    fn test_restore_defaults_is_not_announced() {
        let (mut store, storage) = store_with(AccountTier::Premium);
        assert!(!store.restore());
        assert_eq!(storage.writes(), 0);
    }

    #[test]
    fn test_restore_clamped_to_default_is_not_announced() {
        let storage = MemoryPersistence::with_blob(r#"{"time_range":"3months","tags":["a"]}"#);
        let mut store = FilterStore::new(Box::new(storage.clone()), AccountTier::Free);
        assert!(!store.restore());
        assert_eq!(store.state().time_range, TimeRange::Week);
        // The clamped projection replaces the stored one.
        assert!(!storage.load().differs_from_default());
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let mut store = FilterStore::new(Box::new(MemoryPersistence::disabled()), AccountTier::Premium);
        store.set_domain(Some(Domain::Francais));
        store.set_search_text("dictée");
        assert_eq!(store.state().domain, Some(Domain::Francais));
        assert_eq!(store.state().search_text, "dictée");
    }
}
