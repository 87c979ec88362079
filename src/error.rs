//! Crate-wide error types.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The roadmap-generation call failed (network, HTTP status, or
    /// unparseable body). Fatal to the generation session.
    #[error("roadmap generation failed: {0}")]
    Generation(String),

    /// A single task's video lookup failed. Per-task and non-fatal: callers
    /// degrade to "no resource found" instead of surfacing this at roadmap
    /// level.
    #[error("video lookup failed: {0}")]
    Enrichment(String),

    /// A persistence operation failed on either backend.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A progress subscription or toggle failed.
    #[error("progress sync error: {0}")]
    Sync(String),

    /// Invalid caller input or an operation invoked in the wrong state.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Requested record does not exist on the backend that owns its id.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
