//! Pin tracking for feedq.
//!
//! Pinned stubs hold fixed positions while everything around them changes.
//! Two helpers keep them in place:
//!
//! - [`PinCapture`] detaches every pinned stub before a bulk insert/remove
//!   and re-injects the survivors afterwards. It is consumed by
//!   [`PinCapture::restore`], so a capture cannot leak into a later
//!   operation.
//! - [`PinInventory`] records pinned positions at the start of a drag
//!   gesture (without detaching) and floats pinned stubs back to their slots
//!   on every drag change.

use feedq_types::PostId;
use std::collections::BTreeSet;

use crate::store::{ItemStore, Stub};

/// A pinned stub pulled out of the store, with its former index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRecord {
    /// The detached stub (owns its fragment).
    pub stub: Stub,
    /// Index in full render order at capture time.
    pub position: usize,
}

impl PinRecord {
    /// The pinned post's id.
    pub fn id(&self) -> &PostId {
        &self.stub.id
    }
}

/// Outcome of restoring a capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Pins re-injected at their recorded positions.
    pub restored: Vec<PostId>,
    /// Pins dropped because they were removed in the same operation, or
    /// because their id reappeared in the store meanwhile.
    pub discarded: Vec<PostId>,
}

/// Pinned stubs detached for the duration of one disruptive operation.
#[must_use = "captured pins are lost unless restored"]
#[derive(Debug, Default)]
pub struct PinCapture {
    records: Vec<PinRecord>,
}

impl PinCapture {
    /// Detach every pinned stub from the store.
    pub fn capture(store: &mut ItemStore) -> Self {
        let records = store
            .take_pinned()
            .into_iter()
            .map(|(position, stub)| PinRecord { stub, position })
            .collect();
        Self { records }
    }

    /// Number of captured pins.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check whether a pinned id is held by this capture.
    pub fn contains(&self, id: &PostId) -> bool {
        self.records.iter().any(|r| r.id() == id)
    }

    /// Captured records in capture order.
    pub fn records(&self) -> &[PinRecord] {
        &self.records
    }

    /// Re-inject captured pins, skipping any id in `exclude`.
    ///
    /// Records are replayed in ascending position order so each pin lands
    /// at the index it was taken from.
    pub fn restore(self, store: &mut ItemStore, exclude: &BTreeSet<PostId>) -> RestoreReport {
        let mut report = RestoreReport::default();
        let mut records = self.records;
        records.sort_by_key(|r| r.position);

        for record in records {
            if exclude.contains(record.id()) {
                report.discarded.push(record.stub.id);
                continue;
            }
            let id = record.stub.id.clone();
            match store.inject(record.position, record.stub) {
                Ok(_) => report.restored.push(id),
                Err(_) => report.discarded.push(id),
            }
        }
        report
    }
}

/// Pinned positions recorded when a drag gesture starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinInventory {
    slots: Vec<(PostId, usize)>,
}

impl PinInventory {
    /// Record every pinned stub and its index without detaching it.
    pub fn take(store: &ItemStore) -> Self {
        let slots = store
            .stubs()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.pinned)
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self { slots }
    }

    /// Number of inventoried pins.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no pins were inventoried.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Lift inventoried pins out of the store and put them back at their
    /// recorded indices.
    ///
    /// Pins that disappeared since the inventory was taken are skipped.
    pub fn float_back(&self, store: &mut ItemStore) {
        let mut lifted: Vec<(usize, Stub)> = self
            .slots
            .iter()
            .filter_map(|(id, position)| store.remove(id).map(|stub| (*position, stub)))
            .collect();

        lifted.sort_by_key(|(position, _)| *position);
        for (position, stub) in lifted {
            // Just removed, so the id cannot collide.
            let _ = store.inject(position, stub);
        }
    }
}
