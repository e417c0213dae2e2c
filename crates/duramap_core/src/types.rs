//! Core type definitions for Duramap.

use duramap_codec::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The in-memory contents of one map.
pub type Mirror = HashMap<String, Value>;

/// Identity of a map: its storage path and its name.
///
/// At most one live [`Duramap`](crate::Duramap) exists per identity within a
/// [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapId {
    path: PathBuf,
    name: String,
}

impl MapId {
    /// Creates a map identity. The path should already be normalized.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Returns the storage path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the map name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path.display(), self.name)
    }
}
