//! Error types for the session store.

use std::path::PathBuf;

/// Errors that can occur while loading or saving session records.
///
/// Persistence failures are reported, never fatal: the in-memory record
/// stays valid and the caller decides whether to retry or surface the
/// problem to the facilitator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing a session file failed.
    #[error("session store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized for persistence.
    #[error("failed to serialize session record: {0}")]
    Serialize(#[source] serde_json::Error),
}
