//! FeedManager - the main interface for feedq.
//!
//! This module provides [`FeedManager`], which a host drives from user input
//! and polling ticks.
//!
//! # Architecture
//!
//! FeedManager keeps the pure feed-core types behind async mutexes and
//! performs the I/O they ask for through a [`FeedEndpoint`]. View updates go
//! out through a [`RenderAdapter`].
//!
//! ```text
//! Host → FeedManager → FeedEndpoint → Server
//!            ↓    ↘
//!     feed-core    RenderAdapter
//! ```
//!
//! Lock order is `flush_gate` → `state` → `notice`. No state lock is held
//! across an endpoint call.

use feedq_core::{
    ApplyReport, ChangeDetector, DragSession, FeedState, FlushError, FlushSource, Intent,
    ItemStore, NoticeAction, NoticeEvent, NoticeState, QueueCounts, SearchDebounce,
    SearchDecision, SearchResults, StoreError, Stub, CONFIRM_PROMPT, DEFAULT_DEBOUNCE,
    MIN_QUERY_CHARS,
};
use feedq_types::{
    FeedError, FetchEntry, FetchRequest, FetchResponse, PostId, SearchHit, SearchRequest,
    SearchResponse, Snapshot,
};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::endpoint::{EndpointError, FeedEndpoint};
use crate::render::{NullRenderer, RenderAdapter};

/// Upper bound on the delay between fetch attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Endpoint error.
    #[error("endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    /// Response body could not be used.
    #[error("response error: {0}")]
    Feed(#[from] FeedError),

    /// Flush sequencing error.
    #[error("flush error: {0}")]
    Flush(#[from] FlushError),

    /// Initial feed was invalid.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Another flush holds the gate.
    #[error("a flush is already running")]
    Busy,
}

impl ClientError {
    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Endpoint(_) => true,
            Self::Feed(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Configuration for FeedManager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Period of the heartbeat poll. Zero disables the loop.
    pub heartbeat_interval: Duration,
    /// Quiet period before a search query is dispatched.
    pub debounce: Duration,
    /// Shortest query sent to the search endpoint.
    pub min_query_chars: usize,
    /// Batch-fetch attempts before giving up (at least one is made).
    pub fetch_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub retry_base: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            debounce: DEFAULT_DEBOUNCE,
            min_query_chars: MIN_QUERY_CHARS,
            fetch_attempts: 3,
            retry_base: Duration::from_millis(250),
        }
    }
}

impl ManagerConfig {
    /// Set the heartbeat period.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the search debounce delay.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the minimum query length.
    pub fn with_min_query_chars(mut self, chars: usize) -> Self {
        self.min_query_chars = chars;
        self
    }

    /// Set the number of fetch attempts.
    pub fn with_fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts;
        self
    }

    /// Set the first retry delay.
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at [`MAX_RETRY_DELAY`].
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Answer to a submit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Nothing pending; submit now.
    Proceed,
    /// Ask the user first, then call [`FeedManager::confirm_submit`].
    NeedsConfirmation(String),
}

/// What one search keystroke led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A later keystroke took over.
    Superseded,
    /// Same query as last dispatched; nothing sent.
    Unchanged,
    /// Query too short; results hidden.
    Cleared,
    /// Input moved on while the request was out; response dropped.
    Stale,
    /// Results shown, with this many hits.
    Results(usize),
}

#[derive(Debug)]
struct SearchState {
    debounce: SearchDebounce,
    results: Option<SearchResults>,
}

/// The feed manager.
///
/// Owns the feed, the pending queue, the change detector, the notice and
/// the search box.
pub struct FeedManager<E: FeedEndpoint, R: RenderAdapter = NullRenderer> {
    config: ManagerConfig,
    endpoint: E,
    renderer: R,
    state: Mutex<FeedState>,
    detector: Mutex<ChangeDetector>,
    notice: Mutex<NoticeState>,
    search: Mutex<SearchState>,
    flush_gate: Mutex<()>,
}

impl<E: FeedEndpoint, R: RenderAdapter> FeedManager<E, R> {
    /// Create a manager over the feed the editor was loaded with.
    ///
    /// The initial feed also becomes the change detector's baseline.
    pub fn new(
        config: ManagerConfig,
        endpoint: E,
        renderer: R,
        stubs: Vec<Stub>,
    ) -> Result<Self, ClientError> {
        let store = ItemStore::from_stubs(stubs)?;
        let detector = ChangeDetector::new(store.snapshot());
        let search = SearchState {
            debounce: SearchDebounce::new(config.debounce, config.min_query_chars),
            results: None,
        };
        Ok(Self {
            config,
            endpoint,
            renderer,
            state: Mutex::new(FeedState::new(store)),
            detector: Mutex::new(detector),
            notice: Mutex::new(NoticeState::new()),
            search: Mutex::new(search),
            flush_gate: Mutex::new(()),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Get a reference to the endpoint (for testing).
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Get a reference to the render adapter.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The rendered feed in order.
    pub async fn stubs(&self) -> Vec<Stub> {
        self.state.lock().await.store().stubs().to_vec()
    }

    /// Ids of the rendered feed in order.
    pub async fn order(&self) -> Vec<PostId> {
        self.state.lock().await.store().ids()
    }

    /// Pending counts of the standing queue.
    pub async fn counts(&self) -> QueueCounts {
        self.state.lock().await.counts()
    }

    /// Current notice state.
    pub async fn notice_state(&self) -> NoticeState {
        *self.notice.lock().await
    }

    /// The change detector's accepted baseline.
    pub async fn baseline(&self) -> Snapshot {
        self.detector.lock().await.baseline().clone()
    }

    /// Results currently shown under the search box.
    pub async fn search_results(&self) -> Option<SearchResults> {
        self.search.lock().await.results.clone()
    }

    // ------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------

    /// Queue an insert. Returns `false` if the id is already rendered.
    pub async fn insert(&self, id: PostId, position: usize) -> bool {
        let (queued, counts) = {
            let mut state = self.state.lock().await;
            let queued = state.queue_insert(id.clone(), position);
            (queued, state.counts())
        };
        if queued {
            debug!(%id, position, "queued insert");
        } else {
            debug!(%id, "insert ignored, already rendered");
        }
        self.queue_changed(counts).await;
        queued
    }

    /// Queue a removal. Returns `false` if the id is not rendered.
    pub async fn remove(&self, id: PostId) -> bool {
        let (queued, counts) = {
            let mut state = self.state.lock().await;
            let queued = state.queue_remove(id.clone());
            (queued, state.counts())
        };
        if queued {
            debug!(%id, "queued removal");
        } else {
            debug!(%id, "removal ignored, not rendered");
        }
        self.queue_changed(counts).await;
        queued
    }

    /// Insert one post right away, leaving the standing queue alone.
    ///
    /// Returns `Ok(None)` if the id is already rendered.
    pub async fn insert_single(
        &self,
        id: PostId,
        position: usize,
    ) -> Result<Option<ApplyReport>, ClientError> {
        let (present, counts) = {
            let state = self.state.lock().await;
            (state.store().contains(&id), state.counts())
        };
        if present {
            debug!(%id, "single insert ignored, already rendered");
            self.queue_changed(counts).await;
            return Ok(None);
        }
        let only = BTreeMap::from([(id, position)]);
        self.flush_with(FlushSource::Only(only), FlushSource::Skip)
            .await
    }

    /// Remove one post right away, leaving the standing queue alone.
    ///
    /// Returns `Ok(None)` if the id is not rendered.
    pub async fn remove_single(&self, id: PostId) -> Result<Option<ApplyReport>, ClientError> {
        let (present, counts) = {
            let state = self.state.lock().await;
            (state.store().contains(&id), state.counts())
        };
        if !present {
            debug!(%id, "single removal ignored, not rendered");
            self.queue_changed(counts).await;
            return Ok(None);
        }
        let only = BTreeSet::from([id]);
        self.flush_with(FlushSource::Skip, FlushSource::Only(only))
            .await
    }

    /// Flush the standing queue, waiting behind any flush in progress.
    pub async fn flush(&self) -> Result<Option<ApplyReport>, ClientError> {
        self.flush_with(FlushSource::Queued, FlushSource::Queued)
            .await
    }

    /// Flush the standing queue, failing with [`ClientError::Busy`] if a
    /// flush is in progress.
    pub async fn try_flush(&self) -> Result<Option<ApplyReport>, ClientError> {
        let _gate = self.flush_gate.try_lock().map_err(|_| ClientError::Busy)?;
        self.run_flush(FlushSource::Queued, FlushSource::Queued)
            .await
    }

    /// Flush with per-side overrides.
    ///
    /// Returns `Ok(None)` when both sides are empty. On a fetch error the
    /// standing queue is left as it was and the error is returned.
    pub async fn flush_with(
        &self,
        inserts: FlushSource<BTreeMap<PostId, usize>>,
        removes: FlushSource<BTreeSet<PostId>>,
    ) -> Result<Option<ApplyReport>, ClientError> {
        let _gate = self.flush_gate.lock().await;
        self.run_flush(inserts, removes).await
    }

    async fn run_flush(
        &self,
        inserts: FlushSource<BTreeMap<PostId, usize>>,
        removes: FlushSource<BTreeSet<PostId>>,
    ) -> Result<Option<ApplyReport>, ClientError> {
        let plan = self.state.lock().await.begin_flush(inserts, removes)?;
        let Some(plan) = plan else {
            let counts = self.counts().await;
            self.queue_changed(counts).await;
            return Ok(None);
        };

        let fetched = if plan.needs_fetch() {
            match self.fetch(&plan.inserts).await {
                Ok(entries) => Some(entries),
                Err(e) => {
                    self.state.lock().await.abort_flush()?;
                    warn!(error = %e, pending = plan.inserts.len(), "flush aborted, queue kept");
                    return Err(e);
                }
            }
        } else {
            None
        };

        let (report, counts) = {
            let mut state = self.state.lock().await;
            let report = state.complete_flush(&plan, fetched)?;
            if report.changed() {
                self.renderer.feed_changed(state.store().stubs());
            }
            (report, state.counts())
        };

        if !report.dropped.is_empty() {
            debug!(dropped = ?report.dropped, "fetched ids without a renderable payload");
        }
        if !report.pins_discarded.is_empty() {
            debug!(discarded = ?report.pins_discarded, "pins not restored");
        }
        info!(
            inserted = report.inserted.len(),
            removed = report.removed.len(),
            "feed updated"
        );

        self.queue_changed(counts).await;
        Ok(Some(report))
    }

    async fn fetch(
        &self,
        queue: &BTreeMap<PostId, usize>,
    ) -> Result<BTreeMap<PostId, FetchEntry>, ClientError> {
        let request = FetchRequest::new(queue.clone());
        let attempts = self.config.fetch_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetch_once(&request).await {
                Ok(entries) => return Ok(entries),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = retry_delay(self.config.retry_base, attempt);
                    warn!(attempt, ?delay, error = %e, "batch fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(
        &self,
        request: &FetchRequest,
    ) -> Result<BTreeMap<PostId, FetchEntry>, ClientError> {
        let body = self.endpoint.fetch(request).await?;
        Ok(FetchResponse::from_json(&body)?.into_entries())
    }

    // ------------------------------------------------------------------
    // Change detection
    // ------------------------------------------------------------------

    /// Diff a polled snapshot against the baseline and queue the result.
    pub async fn observe(&self, external: Snapshot) -> QueueCounts {
        let intents = self.detector.lock().await.observe(external);
        if intents.is_empty() {
            return self.counts().await;
        }

        let counts = {
            let mut state = self.state.lock().await;
            for intent in intents {
                match intent {
                    Intent::Insert { id, position } => state.queue_insert(id, position),
                    Intent::Remove { id } => state.queue_remove(id),
                };
            }
            state.counts()
        };

        info!(
            inserts = counts.inserts,
            removes = counts.removes,
            "remote feed changed"
        );
        self.queue_changed(counts).await;
        counts
    }

    /// Poll the endpoint once and observe the result.
    pub async fn poll_heartbeat(&self) -> Result<QueueCounts, ClientError> {
        let tick = self.endpoint.heartbeat().await?;
        Ok(self.observe(Snapshot::from_tick(&tick)).await)
    }

    // ------------------------------------------------------------------
    // Notice and submit
    // ------------------------------------------------------------------

    async fn queue_changed(&self, counts: QueueCounts) {
        self.renderer.queue_changed(counts);
        self.notice_event(NoticeEvent::QueueChanged(counts)).await;
    }

    async fn notice_event(&self, event: NoticeEvent) -> Vec<NoticeAction> {
        let mut notice = self.notice.lock().await;
        let (next, actions) = notice.on_event(event);
        *notice = next;
        for action in &actions {
            self.renderer.notice(action);
        }
        actions
    }

    /// Pull every pending change in and adopt the polled feed as baseline.
    ///
    /// Returns `Ok(None)` when no notice was showing. If the flush fails the
    /// notice is shown again.
    pub async fn accept_pending(&self) -> Result<Option<ApplyReport>, ClientError> {
        let actions = self.notice_event(NoticeEvent::Acknowledged).await;
        if !actions.contains(&NoticeAction::FlushAll) {
            return Ok(None);
        }

        match self.flush().await {
            Ok(report) => {
                self.detector.lock().await.accept();
                Ok(report)
            }
            Err(e) => {
                let counts = self.counts().await;
                self.queue_changed(counts).await;
                Err(e)
            }
        }
    }

    /// Ask whether the surrounding form may submit.
    pub async fn request_submit(&self) -> SubmitDecision {
        let actions = self.notice_event(NoticeEvent::SubmitRequested).await;
        if actions.contains(&NoticeAction::ProceedSubmit) {
            return SubmitDecision::Proceed;
        }
        let prompt = actions
            .into_iter()
            .find_map(|action| match action {
                NoticeAction::PromptConfirm(prompt) => Some(prompt),
                _ => None,
            })
            .unwrap_or_else(|| CONFIRM_PROMPT.to_string());
        SubmitDecision::NeedsConfirmation(prompt)
    }

    /// Answer the confirmation prompt. Returns whether to submit.
    pub async fn confirm_submit(&self, accepted: bool) -> bool {
        let event = if accepted {
            NoticeEvent::SubmitConfirmed
        } else {
            NoticeEvent::SubmitDeclined
        };
        let actions = self.notice_event(event).await;
        actions.contains(&NoticeAction::ProceedSubmit)
    }

    // ------------------------------------------------------------------
    // Pins and drag
    // ------------------------------------------------------------------

    /// Flip the pinned flag of a rendered post.
    pub async fn toggle_pin(&self, id: &PostId) -> Option<bool> {
        let mut state = self.state.lock().await;
        let pinned = state.toggle_pin(id)?;
        self.renderer.feed_changed(state.store().stubs());
        Some(pinned)
    }

    /// Start dragging an unpinned post.
    pub async fn begin_drag(&self, id: &PostId) -> Option<DragSession> {
        self.state.lock().await.begin_drag(id)
    }

    /// Move the dragged post to `target` in render order.
    pub async fn drag_to(&self, session: &DragSession, target: usize) -> bool {
        let mut state = self.state.lock().await;
        let moved = state.drag_to(session, target);
        if moved {
            self.renderer.feed_changed(state.store().stubs());
        }
        moved
    }

    /// Finish a drag gesture.
    pub async fn end_drag(&self, session: DragSession) {
        let mut state = self.state.lock().await;
        state.end_drag(session);
        self.renderer.feed_changed(state.store().stubs());
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Handle one keystroke in the search box.
    ///
    /// Waits out the debounce delay; only the last keystroke of a burst
    /// dispatches a query.
    pub async fn search_input(&self, value: &str) -> Result<SearchOutcome, ClientError> {
        let deadline = {
            let mut search = self.search.lock().await;
            search.debounce.on_input(value, Instant::now().into_std());
            search.debounce.deadline()
        };
        if let Some(deadline) = deadline {
            tokio::time::sleep_until(Instant::from_std(deadline)).await;
        }

        let decision = self
            .search
            .lock()
            .await
            .debounce
            .poll(Instant::now().into_std());
        let query = match decision {
            SearchDecision::Idle => return Ok(SearchOutcome::Superseded),
            SearchDecision::Unchanged => return Ok(SearchOutcome::Unchanged),
            SearchDecision::Clear => {
                self.search.lock().await.results = None;
                self.renderer.search_results(None);
                return Ok(SearchOutcome::Cleared);
            }
            SearchDecision::Dispatch(query) => query,
        };

        debug!(%query, "dispatching search");
        let body = self.endpoint.search(&SearchRequest::new(&query)).await?;
        let response = SearchResponse::from_json(&body)?;

        let mut search = self.search.lock().await;
        if !search.debounce.is_current(&query) {
            debug!(%query, "discarding stale search response");
            return Ok(SearchOutcome::Stale);
        }
        let results = SearchResults::new(response.data);
        let count = results.hits().len();
        self.renderer.search_results(Some(&results));
        search.results = Some(results);
        Ok(SearchOutcome::Results(count))
    }

    /// Move the search highlight down.
    pub async fn search_next(&self) -> Option<SearchHit> {
        self.with_results(SearchResults::select_next).await
    }

    /// Move the search highlight up.
    pub async fn search_prev(&self) -> Option<SearchHit> {
        self.with_results(SearchResults::select_prev).await
    }

    /// Highlight the hit under the pointer.
    pub async fn search_hover(&self, index: usize) -> Option<SearchHit> {
        self.with_results(|results| results.hover(index)).await
    }

    async fn with_results(&self, f: impl FnOnce(&mut SearchResults)) -> Option<SearchHit> {
        let mut search = self.search.lock().await;
        let results = search.results.as_mut()?;
        f(results);
        self.renderer.search_results(Some(&*results));
        results.active().cloned()
    }

    /// Insert the highlighted hit at the top of the feed and hide results.
    ///
    /// Returns `Ok(None)` if no hit is highlighted or it is already rendered.
    pub async fn select_search_result(&self) -> Result<Option<ApplyReport>, ClientError> {
        let hit = {
            let mut search = self.search.lock().await;
            let hit = search.results.as_ref().and_then(|r| r.active().cloned());
            if hit.is_some() {
                search.results = None;
            }
            hit
        };
        let Some(hit) = hit else {
            return Ok(None);
        };

        self.renderer.search_results(None);
        info!(id = %hit.id, title = %hit.title, "inserting search result");
        self.insert_single(hit.id, 0).await
    }
}
