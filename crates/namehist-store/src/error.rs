//! Error types for record storage

use std::path::PathBuf;

/// Errors raised by a [`RecordStore`](crate::RecordStore)
///
/// Every variant means the backing medium could not be read or written;
/// no partial state was committed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error reading or writing the store file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store file exists but does not hold a valid snapshot
    #[error("corrupt store file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// Snapshot could not be encoded
    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Backend refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create corruption error for path
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.into(),
        }
    }
}
