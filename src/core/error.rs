//! Error kinds for upstream fetches and cache lookups

use thiserror::Error;

/// Failures talking to the upstream provider.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Upstream unreachable, timed out, or returned a non-success status.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Empty or undecodable payload.
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
}

/// Failures resolving a lookup against the current directory snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("unknown scheme code {0}")]
    NotFound(u32),

    /// No directory build has completed yet.
    #[error("fund directory has not been built yet")]
    IndexUnready,
}
