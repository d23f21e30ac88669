//! Feed state and the disruptive-operation orchestrator.
//!
//! [`FeedState`] owns the item store and the pending queue and runs every
//! mutation that must keep pinned stubs in place. A flush is split in two so
//! the caller can await the batch fetch in between:
//!
//! 1. [`FeedState::begin_flush`] resolves the effective insert/remove sets
//!    and moves the state to [`FlushPhase::InFlight`].
//! 2. [`FeedState::complete_flush`] applies the fetched fragments and the
//!    removals as one capture → mutate → restore sequence, or
//!    [`FeedState::abort_flush`] leaves the queue untouched for a retry.
//!
//! A second `begin_flush` while one is in flight is rejected.

use feedq_types::{FetchEntry, Fragment, PostId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::pins::{PinCapture, PinInventory};
use crate::queue::{FlushSource, PendingQueue, QueueCounts};
use crate::store::{ItemStore, StoreError, Stub};

/// Error type for flush sequencing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlushError {
    /// Another flush has not completed yet.
    #[error("a flush is already in flight")]
    InFlight,
    /// Completion or abort without a matching begin.
    #[error("no flush is in flight")]
    NotInFlight,
}

/// Whether a capture → mutate → restore sequence is underway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushPhase {
    /// No flush pending; a new one may begin.
    #[default]
    Idle,
    /// A flush began and has not completed or aborted.
    InFlight,
}

/// The effective entries of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushPlan {
    /// Ids to fetch and insert, with target positions.
    pub inserts: BTreeMap<PostId, usize>,
    /// Ids to remove.
    pub removes: BTreeSet<PostId>,
}

impl FlushPlan {
    /// Whether rendered fragments must be fetched before applying.
    pub fn needs_fetch(&self) -> bool {
        !self.inserts.is_empty()
    }

    /// Whether the plan has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.removes.is_empty()
    }
}

/// What a completed flush changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Ids injected into the feed.
    pub inserted: Vec<PostId>,
    /// Requested ids that had no payload or could not be injected.
    pub dropped: Vec<PostId>,
    /// Ids removed from the feed, pinned ones included.
    pub removed: Vec<PostId>,
    /// Pins put back at their fixed positions.
    pub pins_restored: Vec<PostId>,
    /// Pins not put back (removed in this flush, or id collision).
    pub pins_discarded: Vec<PostId>,
}

impl ApplyReport {
    /// Whether the rendered feed changed.
    pub fn changed(&self) -> bool {
        !self.inserted.is_empty() || !self.removed.is_empty()
    }
}

/// An in-progress manual reorder of one unpinned stub.
#[must_use = "a drag session should be ended with FeedState::end_drag"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    id: PostId,
    inventory: PinInventory,
}

impl DragSession {
    /// The stub being dragged.
    pub fn id(&self) -> &PostId {
        &self.id
    }
}

/// Item store, pending queue, and flush phase.
#[derive(Debug, Default)]
pub struct FeedState {
    store: ItemStore,
    queue: PendingQueue,
    phase: FlushPhase,
}

impl FeedState {
    /// Wrap an initial store with an empty queue.
    pub fn new(store: ItemStore) -> Self {
        Self {
            store,
            queue: PendingQueue::new(),
            phase: FlushPhase::Idle,
        }
    }

    /// The rendered feed.
    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// The standing queue.
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// Pending counts of the standing queue.
    pub fn counts(&self) -> QueueCounts {
        self.queue.counts()
    }

    /// Current flush phase.
    pub fn phase(&self) -> FlushPhase {
        self.phase
    }

    /// Queue an insert. Returns `false` if the id is already rendered.
    pub fn queue_insert(&mut self, id: PostId, position: usize) -> bool {
        self.queue.insert(&self.store, id, position)
    }

    /// Queue a removal. Returns `false` if the id is not rendered.
    pub fn queue_remove(&mut self, id: PostId) -> bool {
        self.queue.remove(&self.store, id)
    }

    /// Flip the pinned flag of a rendered stub.
    pub fn toggle_pin(&mut self, id: &PostId) -> Option<bool> {
        self.store.toggle_pin(id)
    }

    /// Resolve the effective flush sets and enter [`FlushPhase::InFlight`].
    ///
    /// Returns `Ok(None)` when both sides are empty; the phase is unchanged.
    pub fn begin_flush(
        &mut self,
        inserts: FlushSource<BTreeMap<PostId, usize>>,
        removes: FlushSource<BTreeSet<PostId>>,
    ) -> Result<Option<FlushPlan>, FlushError> {
        if self.phase == FlushPhase::InFlight {
            return Err(FlushError::InFlight);
        }

        let plan = FlushPlan {
            inserts: self.queue.resolve_inserts(inserts),
            removes: self.queue.resolve_removes(removes),
        };
        if plan.is_empty() {
            return Ok(None);
        }

        self.phase = FlushPhase::InFlight;
        Ok(Some(plan))
    }

    /// Apply a flush plan and return to [`FlushPhase::Idle`].
    ///
    /// `fetched` is the decoded batch-fetch data, or `None` when nothing was
    /// fetched (remove-only plans).
    pub fn complete_flush(
        &mut self,
        plan: &FlushPlan,
        fetched: Option<BTreeMap<PostId, FetchEntry>>,
    ) -> Result<ApplyReport, FlushError> {
        if self.phase != FlushPhase::InFlight {
            return Err(FlushError::NotInFlight);
        }
        let report = self.update_feed(plan, fetched);
        self.phase = FlushPhase::Idle;
        Ok(report)
    }

    /// Abandon an in-flight flush, leaving the standing queue as it was.
    pub fn abort_flush(&mut self) -> Result<(), FlushError> {
        if self.phase != FlushPhase::InFlight {
            return Err(FlushError::NotInFlight);
        }
        self.phase = FlushPhase::Idle;
        Ok(())
    }

    /// Capture pins, inject fetched stubs, delete removals, restore pins.
    fn update_feed(
        &mut self,
        plan: &FlushPlan,
        fetched: Option<BTreeMap<PostId, FetchEntry>>,
    ) -> ApplyReport {
        let capture = PinCapture::capture(&mut self.store);
        let mut report = ApplyReport::default();

        if let Some(mut data) = fetched {
            let mut rendered: Vec<(usize, PostId, Fragment)> = Vec::new();
            for (id, &requested) in &plan.inserts {
                match data.remove(id) {
                    Some(FetchEntry {
                        position,
                        object: Some(fragment),
                    }) if !capture.contains(id) => {
                        rendered.push((position.unwrap_or(requested), id.clone(), fragment));
                    }
                    _ => report.dropped.push(id.clone()),
                }
                self.queue.clear_insert(id);
            }

            // Ascending positions, so earlier inserts shift later ones correctly
            rendered.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
            for (position, id, fragment) in rendered {
                match self.store.inject(position, Stub::new(id.clone(), fragment)) {
                    Ok(_) => report.inserted.push(id),
                    Err(StoreError::Duplicate(dup)) => report.dropped.push(dup),
                }
            }
        }

        for id in &plan.removes {
            if self.store.remove(id).is_some() || capture.contains(id) {
                report.removed.push(id.clone());
            }
            self.queue.clear_remove(id);
            self.queue.clear_insert(id);
        }

        let restore = capture.restore(&mut self.store, &plan.removes);
        report.pins_restored = restore.restored;
        report.pins_discarded = restore.discarded;
        report
    }

    /// Start dragging a stub.
    ///
    /// Returns `None` if the id is not rendered or the stub is pinned.
    pub fn begin_drag(&self, id: &PostId) -> Option<DragSession> {
        let stub = self.store.get(id)?;
        if stub.pinned {
            return None;
        }
        Some(DragSession {
            id: id.clone(),
            inventory: PinInventory::take(&self.store),
        })
    }

    /// Move the dragged stub to `target` (full render order index), then
    /// float pinned stubs back to their slots.
    pub fn drag_to(&mut self, session: &DragSession, target: usize) -> bool {
        if !self.store.move_to(&session.id, target) {
            return false;
        }
        session.inventory.float_back(&mut self.store);
        true
    }

    /// Finish a drag gesture.
    pub fn end_drag(&mut self, session: DragSession) {
        session.inventory.float_back(&mut self.store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> PostId {
        PostId::from(raw)
    }

    fn stub(raw: &str) -> Stub {
        Stub::new(raw, Fragment::new(format!("<li>{raw}</li>")))
    }

    fn pinned(raw: &str) -> Stub {
        Stub::pinned(raw, Fragment::new(format!("<li>{raw}</li>")))
    }

    fn feed(stubs: Vec<Stub>) -> FeedState {
        FeedState::new(ItemStore::from_stubs(stubs).unwrap())
    }

    fn order(state: &FeedState) -> Vec<String> {
        state.store().stubs().iter().map(|s| s.id.to_string()).collect()
    }

    /// Server answer that renders every requested id at its requested position.
    fn render_all(plan: &FlushPlan) -> BTreeMap<PostId, FetchEntry> {
        plan.inserts
            .iter()
            .map(|(id, pos)| {
                (
                    id.clone(),
                    FetchEntry::rendered(*pos, Fragment::new(format!("<li>{id}</li>"))),
                )
            })
            .collect()
    }

    fn flush_queued(state: &mut FeedState) -> ApplyReport {
        let plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap()
            .expect("queue should not be empty");
        let fetched = plan.needs_fetch().then(|| render_all(&plan));
        state.complete_flush(&plan, fetched).unwrap()
    }

    // ===========================================
    // Flush Tests
    // ===========================================

    #[test]
    fn fresh_insert_prepends_and_drains_queue() {
        let mut state = FeedState::default();
        assert!(state.queue_insert(id("42"), 0));
        assert_eq!(state.queue().inserts().get(&id("42")), Some(&0));

        let plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap()
            .unwrap();
        let mut data = BTreeMap::new();
        data.insert(id("42"), FetchEntry::rendered(0, Fragment::new("<frag>")));
        let report = state.complete_flush(&plan, Some(data)).unwrap();

        assert_eq!(report.inserted, vec![id("42")]);
        assert_eq!(order(&state), ["42"]);
        assert!(state.queue().inserts().is_empty());
        assert_eq!(state.phase(), FlushPhase::Idle);
    }

    #[test]
    fn empty_flush_is_noop() {
        let mut state = feed(vec![stub("a")]);
        let plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap();
        assert!(plan.is_none());
        assert_eq!(state.phase(), FlushPhase::Idle);
    }

    #[test]
    fn second_begin_while_in_flight_is_rejected() {
        let mut state = FeedState::default();
        state.queue_insert(id("1"), 0);
        let _plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap()
            .unwrap();

        let second = state.begin_flush(FlushSource::Queued, FlushSource::Queued);
        assert_eq!(second, Err(FlushError::InFlight));
    }

    #[test]
    fn abort_keeps_queue_for_retry() {
        let mut state = FeedState::default();
        state.queue_insert(id("1"), 0);
        let _plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap()
            .unwrap();

        state.abort_flush().unwrap();
        assert_eq!(state.counts(), QueueCounts::new(1, 0));
        assert_eq!(state.phase(), FlushPhase::Idle);
        assert!(state.store().is_empty());
    }

    #[test]
    fn complete_without_begin_is_an_error() {
        let mut state = FeedState::default();
        let result = state.complete_flush(&FlushPlan::default(), None);
        assert_eq!(result, Err(FlushError::NotInFlight));
        assert_eq!(state.abort_flush(), Err(FlushError::NotInFlight));
    }

    #[test]
    fn ids_without_payload_are_dropped_and_cleared() {
        let mut state = FeedState::default();
        state.queue_insert(id("1"), 0);
        state.queue_insert(id("2"), 1);
        let plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap()
            .unwrap();

        let mut data = BTreeMap::new();
        data.insert(id("1"), FetchEntry::rendered(0, Fragment::new("x")));
        data.insert(id("2"), FetchEntry::missing(1));
        let report = state.complete_flush(&plan, Some(data)).unwrap();

        assert_eq!(report.inserted, vec![id("1")]);
        assert_eq!(report.dropped, vec![id("2")]);
        assert!(state.queue().is_empty());
    }

    #[test]
    fn inserts_apply_in_position_order() {
        let mut state = feed(vec![stub("1"), stub("2")]);
        // External order [4, 5, 1, 2]
        state.queue_insert(id("5"), 1);
        state.queue_insert(id("4"), 0);

        flush_queued(&mut state);
        assert_eq!(order(&state), ["4", "5", "1", "2"]);
    }

    #[test]
    fn entry_without_position_lands_at_queued_position() {
        let mut state = feed(vec![stub("1"), stub("2")]);
        state.queue_insert(id("9"), 1);
        let plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap()
            .unwrap();

        let mut data = BTreeMap::new();
        data.insert(
            id("9"),
            FetchEntry {
                position: None,
                object: Some(Fragment::new("<li>9</li>")),
            },
        );
        let report = state.complete_flush(&plan, Some(data)).unwrap();

        assert_eq!(report.inserted, vec![id("9")]);
        assert_eq!(order(&state), ["1", "9", "2"]);
    }

    #[test]
    fn insert_positions_exclude_pinned_stubs() {
        let mut state = feed(vec![pinned("p"), stub("a"), stub("b")]);
        // After the first unpinned stub
        state.queue_insert(id("x"), 1);

        let report = flush_queued(&mut state);
        assert_eq!(order(&state), ["p", "a", "x", "b"]);
        assert_eq!(report.pins_restored, vec![id("p")]);
    }

    #[test]
    fn removal_flush_needs_no_fetch() {
        let mut state = feed(vec![stub("a"), stub("b")]);
        state.queue_remove(id("a"));
        let plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap()
            .unwrap();
        assert!(!plan.needs_fetch());

        let report = state.complete_flush(&plan, None).unwrap();
        assert_eq!(report.removed, vec![id("a")]);
        assert_eq!(order(&state), ["b"]);
        assert!(state.queue().removes().is_empty());
    }

    #[test]
    fn pinned_removal_is_not_restored() {
        let mut state = feed(vec![stub("a"), pinned("p"), stub("b")]);
        state.queue_remove(id("p"));

        let report = flush_queued(&mut state);
        assert_eq!(report.removed, vec![id("p")]);
        assert_eq!(report.pins_discarded, vec![id("p")]);
        assert_eq!(order(&state), ["a", "b"]);
    }

    #[test]
    fn pins_keep_their_slots_across_flush() {
        let mut state = feed(vec![pinned("p0"), stub("a"), pinned("p2"), stub("b"), stub("c")]);
        state.queue_insert(id("x"), 0);
        state.queue_remove(id("b"));

        flush_queued(&mut state);
        let ids = order(&state);
        assert_eq!(ids[0], "p0");
        assert_eq!(ids[2], "p2");
        assert_eq!(state.store().pinned_ids(), vec![id("p0"), id("p2")]);
    }

    #[test]
    fn insert_remove_race_resolves_to_removal() {
        let mut state = FeedState::default();
        assert!(state.queue_insert(id("7"), 0));
        // Rendered out of band before the standing flush ran, then deleted
        state.store.inject(0, stub("7")).unwrap();
        assert!(state.queue_remove(id("7")));
        assert!(state.queue().has_insert(&id("7")));
        assert!(state.queue().has_remove(&id("7")));

        let report = flush_queued(&mut state);
        assert_eq!(report.removed, vec![id("7")]);
        assert!(!state.store().contains(&id("7")));
        assert!(state.queue().is_empty());
    }

    #[test]
    fn only_override_leaves_standing_queue() {
        let mut state = feed(vec![stub("a")]);
        state.queue_insert(id("q"), 0);

        let only: BTreeMap<PostId, usize> = [(id("s"), 0)].into_iter().collect();
        let plan = state
            .begin_flush(FlushSource::Only(only), FlushSource::Skip)
            .unwrap()
            .unwrap();
        let fetched = render_all(&plan);
        state.complete_flush(&plan, Some(fetched)).unwrap();

        assert_eq!(order(&state), ["s", "a"]);
        assert!(state.queue().has_insert(&id("q")));
    }

    #[test]
    fn fetched_id_matching_captured_pin_is_dropped() {
        let mut state = feed(vec![pinned("p"), stub("a")]);
        let only: BTreeMap<PostId, usize> = [(id("p"), 0)].into_iter().collect();
        let plan = state
            .begin_flush(FlushSource::Only(only), FlushSource::Skip)
            .unwrap()
            .unwrap();
        let fetched = render_all(&plan);
        let report = state.complete_flush(&plan, Some(fetched)).unwrap();

        assert_eq!(report.dropped, vec![id("p")]);
        assert_eq!(order(&state), ["p", "a"]);
    }

    #[test]
    fn unrequested_ids_in_response_are_ignored() {
        let mut state = FeedState::default();
        state.queue_insert(id("1"), 0);
        let plan = state
            .begin_flush(FlushSource::Queued, FlushSource::Queued)
            .unwrap()
            .unwrap();
        let mut data = render_all(&plan);
        data.insert(id("99"), FetchEntry::rendered(0, Fragment::new("stray")));

        state.complete_flush(&plan, Some(data)).unwrap();
        assert_eq!(order(&state), ["1"]);
    }

    // ===========================================
    // Drag Tests
    // ===========================================

    #[test]
    fn pinned_survives_reorder() {
        let mut state = feed(vec![pinned("A"), stub("B"), stub("C")]);
        let session = state.begin_drag(&id("C")).unwrap();

        assert!(state.drag_to(&session, 1));
        state.end_drag(session);

        assert_eq!(order(&state), ["A", "C", "B"]);
    }

    #[test]
    fn drag_above_pin_floats_pin_back() {
        let mut state = feed(vec![pinned("A"), stub("B"), stub("C")]);
        let session = state.begin_drag(&id("C")).unwrap();

        state.drag_to(&session, 0);
        assert_eq!(order(&state), ["A", "C", "B"]);
        state.end_drag(session);
    }

    #[test]
    fn pinned_stub_cannot_be_dragged() {
        let state = feed(vec![pinned("A"), stub("B")]);
        assert!(state.begin_drag(&id("A")).is_none());
        assert!(state.begin_drag(&id("missing")).is_none());
    }

    #[test]
    fn drag_keeps_every_pin_in_place() {
        let mut state = feed(vec![
            stub("a"),
            pinned("p1"),
            stub("b"),
            stub("c"),
            pinned("p4"),
            stub("d"),
        ]);
        let session = state.begin_drag(&id("d")).unwrap();
        for target in [0, 3, 1, 5, 2] {
            state.drag_to(&session, target);
            let ids = order(&state);
            assert_eq!(ids[1], "p1", "after drag to {target}");
            assert_eq!(ids[4], "p4", "after drag to {target}");
        }
        state.end_drag(session);
    }
}
