//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The storage file could not be opened or created.
    #[error("open failed: {message}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The underlying engine reported an error.
    #[error("engine error: {0}")]
    Engine(#[from] sled::Error),

    /// The storage is closed.
    #[error("storage is closed")]
    Closed,

    /// A failure produced on purpose by a test engine.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl StorageError {
    /// Creates an open error.
    pub fn open(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an injected failure.
    pub fn injected(message: impl Into<String>) -> Self {
        Self::Injected(message.into())
    }
}
