//! Error types for feedq.

use thiserror::Error;

/// Errors that can occur while decoding or encoding feedq wire data.
#[derive(Debug, Error)]
pub enum FeedError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The endpoint answered with `status: "error"`
    #[error("endpoint reported an error status")]
    ErrorStatus,

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl FeedError {
    /// Whether a retry of the same request could succeed.
    ///
    /// An error status is a server-side condition; malformed bodies are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ErrorStatus)
    }
}
