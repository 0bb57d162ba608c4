//! Backup error types

use thiserror::Error;

/// Errors surfaced by a synchronization run
///
/// `PathConflict` and `Transport` are per-path outcomes recorded in a
/// [`RunReport`](super::RunReport); they never abort sibling paths.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Source records could not be read; the run stops before any upload
    #[error("Source data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Remote revision conflict on {path}")]
    PathConflict { path: String },

    #[error("Transport error on {path}: {message}")]
    Transport { path: String, message: String },

    /// Remote credential or repository not configured
    #[error("Backup not configured: {0}")]
    ConfigurationMissing(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The run task panicked
    #[error("Backup run aborted: {0}")]
    Aborted(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Encoding(err.to_string())
    }
}

/// Errors from the remote file store boundary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Supplied revision is stale or missing for an existing path
    #[error("Revision conflict: {0}")]
    Conflict(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}
