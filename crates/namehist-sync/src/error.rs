//! Error types for the name history ledger
//!
//! - Storage failures abort the event; nothing was committed
//! - Message sync failures leave history intact; only the message is stale

use crate::sink::SinkError;
use namehist_core::UserId;
use namehist_store::StoreError;

/// Main ledger error type
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Record store could not be read or written
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),

    /// History was saved but the message could not be brought in sync
    #[error("message sync failed for user {user_id}: {source}")]
    ArtifactSyncFailed {
        user_id: UserId,
        #[source]
        source: SinkError,
    },
}

impl HistoryError {
    #[inline]
    pub fn sync_failed(user_id: UserId, source: SinkError) -> Self {
        Self::ArtifactSyncFailed { user_id, source }
    }

    /// Whether the user's history was persisted despite the error
    #[inline]
    #[must_use]
    pub fn history_persisted(&self) -> bool {
        matches!(self, Self::ArtifactSyncFailed { .. })
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StorageUnavailable(_) => true,
            Self::ArtifactSyncFailed { source, .. } => source.is_retryable(),
        }
    }
}

/// Result type alias for ledger operations
pub type HistoryResult<T> = Result<T, HistoryError>;
