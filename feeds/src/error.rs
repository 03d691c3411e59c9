//! Feed error types.

use std::path::PathBuf;

/// Errors that can occur while fetching market data.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("failed to read snapshot {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write snapshot {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
