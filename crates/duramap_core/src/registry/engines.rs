//! Engine handle registry.

use crate::error::{CoreError, CoreResult};
use duramap_storage::{StorageEngine, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Opens the storage engine for a (normalized) path.
pub type EngineOpener =
    Arc<dyn Fn(&Path) -> StorageResult<Arc<dyn StorageEngine>> + Send + Sync>;

/// Normalizes a path to absolute form without touching the filesystem.
///
/// `./a.db` and `<cwd>/a.db` normalize to the same path. Symlinks are not
/// resolved, so two different links to one file are two identities.
pub(crate) fn normalize_path(path: &Path) -> CoreResult<PathBuf> {
    std::path::absolute(path).map_err(|e| CoreError::storage_open(path, StorageError::Io(e)))
}

struct Handle {
    engine: Arc<dyn StorageEngine>,
    refs: usize,
}

/// Table of open engine handles, at most one per path.
///
/// Every map opened against a path shares that path's handle. Handles are
/// reference counted: the engine is closed when the last holder releases
/// it, and the next [`acquire`](Self::acquire) opens a fresh one.
pub struct EngineRegistry {
    opener: EngineOpener,
    handles: Mutex<HashMap<PathBuf, Handle>>,
}

impl EngineRegistry {
    /// Creates an empty registry that opens engines with `opener`.
    #[must_use]
    pub fn new(opener: EngineOpener) -> Self {
        Self {
            opener,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the handle for `path`, opening it if needed.
    ///
    /// Concurrent callers for the same path converge on one handle; the
    /// registry's own lock is held while the engine opens.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StorageOpen`] if the engine cannot be opened.
    pub fn acquire(&self, path: &Path) -> CoreResult<Arc<dyn StorageEngine>> {
        let path = normalize_path(path)?;
        let mut handles = self.handles.lock();

        if let Some(handle) = handles.get_mut(&path) {
            handle.refs += 1;
            debug!(path = %path.display(), refs = handle.refs, "sharing engine handle");
            return Ok(Arc::clone(&handle.engine));
        }

        let engine = (self.opener)(&path).map_err(|e| CoreError::storage_open(&path, e))?;
        debug!(path = %path.display(), "opened engine handle");
        handles.insert(
            path,
            Handle {
                engine: Arc::clone(&engine),
                refs: 1,
            },
        );
        Ok(engine)
    }

    /// Drops one reference to the handle for `path`.
    ///
    /// The engine is closed and forgotten when no reference is left.
    /// Releasing a path that is not open does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Close`] if closing the engine fails. The handle
    /// is forgotten either way.
    pub fn release(&self, path: &Path) -> CoreResult<()> {
        let path = normalize_path(path)?;
        let mut handles = self.handles.lock();

        let Some(handle) = handles.get_mut(&path) else {
            return Ok(());
        };
        handle.refs -= 1;
        if handle.refs > 0 {
            debug!(path = %path.display(), refs = handle.refs, "released engine handle");
            return Ok(());
        }

        if let Some(handle) = handles.remove(&path) {
            handle
                .engine
                .close()
                .map_err(|e| CoreError::close(&path, e))?;
            debug!(path = %path.display(), "closed engine handle");
        }
        Ok(())
    }

    /// Returns true if a handle for `path` is open.
    #[must_use]
    pub fn is_open(&self, path: &Path) -> bool {
        normalize_path(path).is_ok_and(|path| self.handles.lock().contains_key(&path))
    }

    /// Returns the number of open handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    /// Returns true if no handle is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("handles", &self.len())
            .finish_non_exhaustive()
    }
}
