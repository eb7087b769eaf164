// Fiches - core/debounce.rs
//
// Per-dimension debounce for the filter state.
//
// Each dimension owns an independent timer: a change to the search text never
// delays a pending domain change and vice versa. Time is always passed in by
// the caller, so the coalescer holds no clock and is deterministic in tests.

use crate::core::filter::{FilterState, SettledFilterState, TagSet};
use crate::core::model::{ClassLevel, Domain, TimeRange};
use std::time::{Duration, Instant};

// =============================================================================
// Debounced<T>
// =============================================================================

/// A value that settles once it has stopped changing for `delay`.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    live: T,
    settled: T,
    /// Last scheduled update. Replaced on every `set`, so a superseded timer
    /// can never commit.
    pending: Option<(T, Instant)>,
    delay: Duration,
}

impl<T: Clone + PartialEq> Debounced<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            live: initial.clone(),
            settled: initial,
            pending: None,
            delay,
        }
    }

    /// Record a new live value and (re)start this dimension's timer.
    pub fn set(&mut self, value: T, now: Instant) {
        self.live = value.clone();
        self.pending = Some((value, now + self.delay));
    }

    /// Commit the pending value if its timer has expired.
    ///
    /// Returns true only when the settled value actually changed; a value
    /// that was edited and then restored within the window expires silently.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some((_, due)) if now >= due => self.commit(),
            _ => false,
        }
    }

    /// Commit the pending value immediately, regardless of its timer.
    pub fn flush(&mut self) -> bool {
        if self.pending.is_some() {
            self.commit()
        } else {
            false
        }
    }

    fn commit(&mut self) -> bool {
        match self.pending.take() {
            Some((value, _)) => {
                let changed = value != self.settled;
                self.settled = value;
                changed
            }
            None => false,
        }
    }

    /// Set both live and settled values at once, dropping any pending timer.
    pub fn reset(&mut self, value: T) {
        self.live = value.clone();
        self.settled = value;
        self.pending = None;
    }

    pub fn live(&self) -> &T {
        &self.live
    }

    pub fn settled(&self) -> &T {
        &self.settled
    }

    /// True while the live value differs from the settled one.
    pub fn is_pending(&self) -> bool {
        self.live != self.settled
    }

    /// When the scheduled update commits, if any.
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }
}

// =============================================================================
// FilterDebouncer
// =============================================================================

/// Debounce coalescer over every filter dimension.
#[derive(Debug, Clone)]
pub struct FilterDebouncer {
    domain: Debounced<Option<Domain>>,
    level: Debounced<Option<ClassLevel>>,
    time_range: Debounced<TimeRange>,
    tags: Debounced<TagSet>,
    search_text: Debounced<String>,
}

impl FilterDebouncer {
    /// Create a coalescer whose live and settled values both equal `initial`.
    pub fn new(initial: &FilterState, delay: Duration) -> Self {
        Self {
            domain: Debounced::new(initial.domain, delay),
            level: Debounced::new(initial.level, delay),
            time_range: Debounced::new(initial.time_range, delay),
            tags: Debounced::new(initial.tags.clone(), delay),
            search_text: Debounced::new(initial.search_text.clone(), delay),
        }
    }

    /// Feed the current live filter state.
    ///
    /// Only dimensions whose live value changed get their timer restarted.
    pub fn observe(&mut self, state: &FilterState, now: Instant) {
        if *self.domain.live() != state.domain {
            self.domain.set(state.domain, now);
        }
        if *self.level.live() != state.level {
            self.level.set(state.level, now);
        }
        if *self.time_range.live() != state.time_range {
            self.time_range.set(state.time_range, now);
        }
        if *self.tags.live() != state.tags {
            self.tags.set(state.tags.clone(), now);
        }
        if *self.search_text.live() != state.search_text {
            self.search_text.set(state.search_text.clone(), now);
        }
    }

    /// Advance all timers. Returns the new settled state if any dimension
    /// settled to a different value.
    pub fn poll(&mut self, now: Instant) -> Option<SettledFilterState> {
        // Poll every dimension; `|` rather than `||` so none is skipped.
        let changed = self.domain.poll(now)
            | self.level.poll(now)
            | self.time_range.poll(now)
            | self.tags.poll(now)
            | self.search_text.poll(now);
        changed.then(|| self.settled())
    }

    /// Commit every pending dimension now.
    pub fn flush(&mut self) -> Option<SettledFilterState> {
        let changed = self.domain.flush()
            | self.level.flush()
            | self.time_range.flush()
            | self.tags.flush()
            | self.search_text.flush();
        changed.then(|| self.settled())
    }

    /// Snap every dimension to `state` without going through the timers.
    pub fn reset(&mut self, state: &FilterState) {
        self.domain.reset(state.domain);
        self.level.reset(state.level);
        self.time_range.reset(state.time_range);
        self.tags.reset(state.tags.clone());
        self.search_text.reset(state.search_text.clone());
    }

    /// Current settled snapshot.
    pub fn settled(&self) -> SettledFilterState {
        SettledFilterState::new(FilterState {
            domain: *self.domain.settled(),
            level: *self.level.settled(),
            time_range: *self.time_range.settled(),
            tags: self.tags.settled().clone(),
            search_text: self.search_text.settled().clone(),
        })
    }

    /// True while any dimension is still settling.
    pub fn is_pending(&self) -> bool {
        self.domain.is_pending()
            || self.level.is_pending()
            || self.time_range.is_pending()
            || self.tags.is_pending()
            || self.search_text.is_pending()
    }

    /// Earliest instant at which a pending dimension commits.
    pub fn next_due(&self) -> Option<Instant> {
        [
            self.domain.due(),
            self.level.due(),
            self.time_range.due(),
            self.tags.due(),
            self.search_text.due(),
        ]
        .into_iter()
        .flatten()
        .min()
    }
}
