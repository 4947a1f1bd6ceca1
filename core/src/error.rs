use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the synchronization engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Non-2xx response or transport-level failure on a single request.
    /// Never retried; the failed page simply contributes nothing.
    #[error("transport failure: {message}")]
    Transport {
        status: Option<StatusCode>,
        message: String,
    },

    /// Response body could not be interpreted, including service errors
    /// reported inside a 200 body.
    #[error("malformed response: {0}")]
    Parse(String),

    /// The owning round was superseded before this work could commit. Not a
    /// true failure; results are silently discarded.
    #[error("round superseded")]
    Cancelled,

    /// Partition code not present in the registry.
    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    /// Settings persistence failure.
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}
