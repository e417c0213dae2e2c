//! Error types for Duramap core.

use duramap_storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Duramap core operations.
///
/// Engine reads and writes are never retried internally; every failure is
/// surfaced to the caller with the mirror and durable state still in
/// agreement.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The storage file could not be opened or created.
    #[error("cannot open storage at {}: {source}", path.display())]
    StorageOpen {
        /// Path of the storage file.
        path: PathBuf,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// Reading the map's bucket failed.
    #[error("cannot load map {map:?}: {source}")]
    Load {
        /// Name of the map.
        map: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// A stored record is malformed.
    #[error("cannot decode record {key:?}: {message}")]
    Decode {
        /// Key of the record.
        key: String,
        /// Description of the problem.
        message: String,
    },

    /// A stored record failed authentication.
    #[error("unable to decrypt: {message}")]
    Decryption {
        /// Description of the failure.
        message: String,
    },

    /// A commit or reset could not be made durable.
    #[error("cannot persist map {map:?}: {source}")]
    Persist {
        /// Name of the map.
        map: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// Releasing the storage file failed.
    #[error("cannot close storage at {}: {source}", path.display())]
    Close {
        /// Path of the storage file.
        path: PathBuf,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// The map is already open with a different secret.
    #[error("map {name:?} at {} is already open with a different secret", path.display())]
    SecretConflict {
        /// Path of the storage file.
        path: PathBuf,
        /// Name of the map.
        name: String,
    },

    /// Invalid key size.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// Key derivation failed.
    #[error("key derivation failed: {message}")]
    KeyDerivation {
        /// Description of the failure.
        message: String,
    },

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    Encryption {
        /// Description of the failure.
        message: String,
    },

    /// The map instance has been closed.
    #[error("map {name:?} is closed")]
    Closed {
        /// Name of the map.
        name: String,
    },
}

impl CoreError {
    /// Creates a storage open error.
    pub fn storage_open(path: impl Into<PathBuf>, source: StorageError) -> Self {
        Self::StorageOpen {
            path: path.into(),
            source,
        }
    }

    /// Creates a load error.
    pub fn load(map: impl Into<String>, source: StorageError) -> Self {
        Self::Load {
            map: map.into(),
            source,
        }
    }

    /// Creates a decode error.
    pub fn decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a decryption error.
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
        }
    }

    /// Creates a persist error.
    pub fn persist(map: impl Into<String>, source: StorageError) -> Self {
        Self::Persist {
            map: map.into(),
            source,
        }
    }

    /// Creates a close error.
    pub fn close(path: impl Into<PathBuf>, source: StorageError) -> Self {
        Self::Close {
            path: path.into(),
            source,
        }
    }

    /// Creates a secret conflict error.
    pub fn secret_conflict(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self::SecretConflict {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Creates an invalid key size error.
    pub fn invalid_key_size(actual: usize, expected: usize) -> Self {
        Self::InvalidKeySize { expected, actual }
    }

    /// Creates a key derivation error.
    pub fn key_derivation(message: impl Into<String>) -> Self {
        Self::KeyDerivation {
            message: message.into(),
        }
    }

    /// Creates an encryption error.
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Creates a closed-map error.
    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed { name: name.into() }
    }
}
