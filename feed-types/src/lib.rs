//! # feed-types
//!
//! Wire format types for the feedq pinned feed reconciliation queue.
//!
//! This crate provides the foundational types used across all feedq crates:
//! - [`PostId`], [`Fragment`] - Identity and opaque render payload types
//! - [`Snapshot`], [`HeartbeatTick`] - Comparable summaries of feed state
//! - [`FetchRequest`], [`FetchResponse`], [`SearchRequest`], [`SearchResponse`] - Endpoint envelopes
//! - [`FeedError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod snapshot;

pub use envelope::{
    FetchEntry, FetchRequest, FetchResponse, SearchHit, SearchRequest, SearchResponse, Status,
    FETCH_ACTION, SEARCH_ACTION,
};
pub use error::FeedError;
pub use ids::{Fragment, PostId};
pub use snapshot::{HeartbeatTick, Snapshot};
