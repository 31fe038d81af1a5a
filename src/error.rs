//! Error taxonomy for the tracking and index core.
//!
//! Orchestration code uses `anyhow` for context-rich propagation; these
//! variants exist where callers need to distinguish failure classes: a
//! partial deletion must not abort a re-index, while corrupt tracking
//! state must halt until the operator resets it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tracking state exists on disk but cannot be parsed. Never silently
    /// discarded; the operator must inspect or `clear` explicitly.
    #[error("tracking state at {} is unreadable: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error("index backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("vector has {got} dimensions, index expects {want}")]
    DimensionMismatch { want: usize, got: usize },

    /// One or more chunk ids could not be deleted. The remaining ids were
    /// still attempted; the failed ones are listed here.
    #[error("failed to delete {} chunk(s): {}", failed.len(), failed.join(", "))]
    PartialDeletion { failed: Vec<String> },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
