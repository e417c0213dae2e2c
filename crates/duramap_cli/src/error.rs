//! CLI error type.

use duramap_core::CoreError;
use duramap_storage::StorageError;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by the `duramap` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// A required argument was not given.
    #[error("{0}")]
    Usage(String),

    /// The map or its storage failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The storage engine failed outside of any map.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The requested key is not in the map.
    #[error("key `{0}` not found")]
    NotFound(String),

    /// A value given on the command line is not valid JSON.
    #[error("invalid JSON value: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value has no JSON form.
    #[error("value of `{key}` cannot be shown as JSON: {message}")]
    Unrepresentable {
        /// Key of the value.
        key: String,
        /// What could not be converted.
        message: String,
    },

    /// The output could not be written.
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}
