//! # feed-client
//!
//! Async feed manager for feedq.
//!
//! This is the library a host application drives: it owns the feed, the
//! pending queue and the notice, and talks to the server through a
//! [`FeedEndpoint`].
//!
//! ## Features
//!
//! - **Flush gate**: one capture → mutate → restore sequence at a time
//! - **Retry with backoff**: transient batch-fetch failures are retried
//! - **Heartbeat loop**: polls the authoritative feed on an interval
//! - **Debounced search**: one query per quiet period, stale results dropped
//! - **Pure core**: all reconciliation logic lives in feed-core
//!
//! ## Example
//!
//! ```ignore
//! use feedq_client::{FeedManager, ManagerConfig, MockEndpoint, NullRenderer};
//!
//! let endpoint = MockEndpoint::new();
//! let manager = FeedManager::new(ManagerConfig::default(), endpoint, NullRenderer, vec![])?;
//!
//! manager.insert("42".into(), 0).await;
//! manager.flush().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod endpoint;
pub mod heartbeat;
pub mod manager;
pub mod render;

pub use endpoint::{EndpointError, FeedEndpoint, MockEndpoint};
pub use heartbeat::spawn_heartbeat;
pub use manager::{
    retry_delay, ClientError, FeedManager, ManagerConfig, SearchOutcome, SubmitDecision,
    MAX_RETRY_DELAY,
};
pub use render::{NullRenderer, RenderAdapter};
