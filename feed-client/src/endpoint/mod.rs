//! Server collaborators for feedq.
//!
//! The manager never talks to the network directly. It goes through a
//! [`FeedEndpoint`], which covers the three server interactions:
//! - `fetch()` posts a batch-fetch request and returns the raw body
//! - `search()` posts a search request and returns the raw body
//! - `heartbeat()` returns the latest authoritative id lists
//!
//! Bodies are returned undecoded so envelope errors surface in one place.

mod mock;

pub use mock::MockEndpoint;

use async_trait::async_trait;
use feedq_types::{FetchRequest, HeartbeatTick, SearchRequest};
use thiserror::Error;

/// Endpoint errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// Request could not be completed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// No endpoint is reachable.
    #[error("endpoint unavailable")]
    Unavailable,
}

/// Server-side collaborator.
///
/// Implementations handle the transport (HTTP, in-process, mock).
#[async_trait]
pub trait FeedEndpoint: Send + Sync {
    /// Send a batch-fetch request, returning the response body.
    async fn fetch(&self, request: &FetchRequest) -> Result<String, EndpointError>;

    /// Send a search request, returning the response body.
    async fn search(&self, request: &SearchRequest) -> Result<String, EndpointError>;

    /// Read the authoritative feed.
    async fn heartbeat(&self) -> Result<HeartbeatTick, EndpointError>;
}
