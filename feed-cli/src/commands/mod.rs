//! CLI command implementations.

pub mod diff;
pub mod replay;
