//! Search input debouncing and result navigation.
//!
//! [`SearchDebounce`] is a clock-free timer: the caller passes `now` on every
//! call and sleeps until [`SearchDebounce::deadline`] itself. A query is
//! dispatched once input has been quiet for the debounce delay, is at least
//! the minimum length, and differs from the last dispatched query.

use feedq_types::SearchHit;
use std::time::{Duration, Instant};

/// Quiet period after the last keystroke before a query is dispatched.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Shortest query (in characters) sent to the search endpoint.
pub const MIN_QUERY_CHARS: usize = 3;

/// What to do when the debounce timer is polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchDecision {
    /// Timer not armed or not yet expired.
    Idle,
    /// Input equals the last dispatched query.
    Unchanged,
    /// Send this query.
    Dispatch(String),
    /// Input is too short; hide any results.
    Clear,
}

/// Debounce timer for the search box.
#[derive(Debug, Clone)]
pub struct SearchDebounce {
    delay: Duration,
    min_chars: usize,
    input: String,
    deadline: Option<Instant>,
    dispatched: Option<String>,
}

impl Default for SearchDebounce {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, MIN_QUERY_CHARS)
    }
}

impl SearchDebounce {
    /// Create a timer with the given delay and minimum query length.
    pub fn new(delay: Duration, min_chars: usize) -> Self {
        Self {
            delay,
            min_chars,
            input: String::new(),
            deadline: None,
            dispatched: None,
        }
    }

    /// Record a keystroke and re-arm the timer.
    pub fn on_input(&mut self, value: &str, now: Instant) {
        self.input = value.to_string();
        self.deadline = Some(now + self.delay);
    }

    /// Current input value.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// When the timer fires, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire the timer if it has expired.
    pub fn poll(&mut self, now: Instant) -> SearchDecision {
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return SearchDecision::Idle,
        }
        self.deadline = None;

        if self.dispatched.as_deref() == Some(self.input.as_str()) {
            return SearchDecision::Unchanged;
        }
        self.dispatched = Some(self.input.clone());

        if self.input.chars().count() >= self.min_chars {
            SearchDecision::Dispatch(self.input.clone())
        } else {
            SearchDecision::Clear
        }
    }

    /// Check if a response for `query` is still wanted.
    pub fn is_current(&self, query: &str) -> bool {
        self.dispatched.as_deref() == Some(query) && self.input == query
    }
}

/// Ordered search hits with a highlighted entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    hits: Vec<SearchHit>,
    active: usize,
}

impl SearchResults {
    /// Wrap hits; the first one is active.
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits, active: 0 }
    }

    /// Check if there are no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// All hits in order.
    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    /// Index of the active hit.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The active hit.
    pub fn active(&self) -> Option<&SearchHit> {
        self.hits.get(self.active)
    }

    /// Move the highlight down. Stops at the last hit.
    pub fn select_next(&mut self) {
        if self.active + 1 < self.hits.len() {
            self.active += 1;
        }
    }

    /// Move the highlight up. Stops at the first hit.
    pub fn select_prev(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    /// Activate a hit under the pointer. Out-of-range indices are ignored.
    pub fn hover(&mut self, index: usize) {
        if index < self.hits.len() {
            self.active = index;
        }
    }
}
