//! Registry configuration.

use duramap_storage::EngineOptions;

/// Configuration for opening maps.
///
/// Applies to every storage file opened through one
/// [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether to create missing parent directories of a storage path.
    pub create_dirs: bool,

    /// Whether to flush the engine on every commit (safer but slower).
    pub sync_on_commit: bool,

    /// Size of the engine's page cache in bytes.
    pub cache_capacity: u64,

    /// Background flush interval of the engine. Commits already flush when
    /// `sync_on_commit` is set, so this is off by default.
    pub flush_every_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_dirs: true,
            sync_on_commit: true,
            cache_capacity: 64 * 1024 * 1024, // 64 MB
            flush_every_ms: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create missing parent directories.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }

    /// Sets whether to flush the engine on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the engine page cache size.
    #[must_use]
    pub const fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Sets the background flush interval.
    #[must_use]
    pub const fn flush_every_ms(mut self, value: Option<u64>) -> Self {
        self.flush_every_ms = value;
        self
    }

    /// Derives the options passed to the storage engine.
    #[must_use]
    pub fn to_engine_options(&self) -> EngineOptions {
        EngineOptions {
            create_dirs: self.create_dirs,
            sync_on_commit: self.sync_on_commit,
            cache_capacity: self.cache_capacity,
            flush_every_ms: self.flush_every_ms,
        }
    }
}
