use thiserror::Error;

use crate::api::FetchError;
use crate::cache::StoreError;

/// Everything that can go wrong during one reconciliation attempt.
///
/// Only `ConnectivityUnavailable` and `Transport` reach presentation code,
/// as the `Offline` and `Error` statuses. The rest are absorbed.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No network connection")]
    ConnectivityUnavailable,

    #[error("{0}")]
    Transport(String),

    #[error("Sync attempt cancelled")]
    Cancelled,

    #[error("Failed to persist device cache: {0}")]
    Persistence(#[from] StoreError),
}

impl SyncError {
    pub fn is_observable(&self) -> bool {
        matches!(self, SyncError::ConnectivityUnavailable | SyncError::Transport(_))
    }
}

impl From<FetchError> for SyncError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => SyncError::Cancelled,
            other => SyncError::Transport(other.to_string()),
        }
    }
}
