//! # feed-core
//!
//! Pure logic for feedq (no I/O, instant tests).
//!
//! This crate implements the reconciliation queue, pin tracking, change
//! detection and notice state machine without any network access, timers
//! or rendering, enabling fast unit tests.
//!
//! ## Purity
//!
//! Nothing here touches the network or a clock. Each disruptive operation
//! is a plain method call on [`FeedState`]:
//! - [`PinCapture`] is taken and consumed inside one `complete_flush`, and a
//!   drag's [`PinInventory`] dies with its [`DragSession`], so pin state never
//!   outlives the operation that made it
//! - the flush is split into `begin_flush` / `complete_flush` around the
//!   caller's fetch, and [`FlushPhase`] refuses a second begin in between
//! - the search debounce is handed `Instant`s instead of reading the time
//!
//! Outcomes come back as values ([`ApplyReport`], [`Intent`],
//! [`NoticeAction`]) rather than being logged or rendered here.
//!
//! The actual I/O (fetching fragments, polling, rendering) is performed by
//! `feed-client`, which drives these types and interprets their reports.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod detector;
pub mod feed;
pub mod notice;
pub mod pins;
pub mod queue;
pub mod search;
pub mod store;

pub use detector::{diff, ChangeDetector, Intent};
pub use feed::{ApplyReport, DragSession, FeedState, FlushError, FlushPhase, FlushPlan};
pub use notice::{summary, NoticeAction, NoticeEvent, NoticeState, CONFIRM_PROMPT};
pub use pins::{PinCapture, PinInventory, PinRecord, RestoreReport};
pub use queue::{FlushSource, PendingQueue, QueueCounts};
pub use search::{SearchDebounce, SearchDecision, SearchResults, DEFAULT_DEBOUNCE, MIN_QUERY_CHARS};
pub use store::{ItemStore, StoreError, Stub};
