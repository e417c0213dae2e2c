//! The map instance.

use crate::crypto::Cipher;
use crate::error::{CoreError, CoreResult};
use crate::record::{decode_record, encode_record};
use crate::registry::RegistryInner;
use crate::transaction::{PendingWrite, Transaction};
use crate::types::{MapId, Mirror};
use duramap_codec::Value;
use duramap_storage::{StorageEngine, WriteBatch};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// State guarded by the map's read/write lock.
struct MapState {
    /// Cache of the bucket's durable contents.
    mirror: Mirror,
    /// Shared engine handle. `None` once the map is closed.
    engine: Option<Arc<dyn StorageEngine>>,
}

/// A durable in-memory map mirroring one bucket of a storage file.
///
/// Obtained from [`Registry::open`](crate::Registry::open); every caller
/// opening the same `(path, name)` through one registry shares this
/// instance, its mirror and its lock.
///
/// # Consistency
///
/// - Updates are serialized and hold the exclusive lock from the mutator
///   call until the merge into the mirror
/// - A commit is made durable before the mirror changes, so readers never
///   observe a value that is not yet on disk
/// - Any failure leaves the mirror exactly as it was
///
/// # Lifecycle
///
/// ```text
/// open -> load -> (update | read | truncate)* -> close
/// ```
///
/// After [`close`](Self::close), reads keep returning the last mirror while
/// `load`, `update` and `truncate` fail with [`CoreError::Closed`].
pub struct Duramap {
    id: MapId,
    cipher: Option<Cipher>,
    fingerprint: Option<String>,
    registry: Weak<RegistryInner>,
    state: RwLock<MapState>,
}

/// Shared read access to a map's mirror.
///
/// Holds the map's shared lock until dropped; updates wait for it.
#[derive(Debug)]
pub struct MirrorGuard<'a> {
    guard: MappedRwLockReadGuard<'a, Mirror>,
}

impl Deref for MirrorGuard<'_> {
    type Target = Mirror;

    fn deref(&self) -> &Mirror {
        &self.guard
    }
}

impl Duramap {
    pub(crate) fn new(
        registry: Weak<RegistryInner>,
        id: MapId,
        engine: Arc<dyn StorageEngine>,
        cipher: Option<Cipher>,
        fingerprint: Option<String>,
    ) -> Self {
        Self {
            id,
            cipher,
            fingerprint,
            registry,
            state: RwLock::new(MapState {
                mirror: Mirror::new(),
                engine: Some(engine),
            }),
        }
    }

    /// Returns the identity of this map.
    #[must_use]
    pub fn id(&self) -> &MapId {
        &self.id
    }

    /// Returns the normalized storage path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.id.path()
    }

    /// Returns the map name, which is also its bucket name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Returns true if stored records are encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Returns the fingerprint of the map's secret, if encrypted.
    #[must_use]
    pub fn secret_fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Returns true once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.read().engine.is_none()
    }

    fn engine(&self, state: &MapState) -> CoreResult<Arc<dyn StorageEngine>> {
        state
            .engine
            .clone()
            .ok_or_else(|| CoreError::closed(self.name()))
    }

    /// Rebuilds the mirror from the stored bucket.
    ///
    /// Creates the bucket if it does not exist. Always reloads: whatever was
    /// in the mirror is replaced, since the mirror only ever caches durable
    /// state. Empty records are skipped.
    ///
    /// The exclusive lock is held for the whole load, so no update can
    /// commit between the scan and the swap.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Closed`] if the map was closed
    /// - [`CoreError::Load`] if the bucket cannot be read
    /// - [`CoreError::Decryption`] if a record fails authentication
    /// - [`CoreError::Decode`] if a record is malformed
    ///
    /// On error the previous mirror is kept.
    pub fn load(&self) -> CoreResult<()> {
        let mut state = self.state.write();
        let engine = self.engine(&state)?;

        engine
            .ensure_bucket(self.name())
            .map_err(|e| CoreError::load(self.name(), e))?;

        let mut mirror = Mirror::new();
        let mut tombstones = 0usize;
        let cursor = engine
            .scan(self.name())
            .map_err(|e| CoreError::load(self.name(), e))?;

        for record in cursor {
            let (key, bytes) = record.map_err(|e| CoreError::load(self.name(), e))?;
            let key = String::from_utf8(key).map_err(|e| {
                CoreError::decode(
                    String::from_utf8_lossy(e.as_bytes()),
                    "key is not valid UTF-8",
                )
            })?;

            match decode_record(&key, &bytes, self.cipher.as_ref())? {
                Some(value) => {
                    mirror.insert(key, value);
                }
                None => {
                    trace!(map = self.name(), key = %key, "skipping tombstone");
                    tombstones += 1;
                }
            }
        }

        debug!(
            path = %self.path().display(),
            map = self.name(),
            records = mirror.len(),
            tombstones,
            "loaded map"
        );
        state.mirror = mirror;
        Ok(())
    }

    /// Runs `mutator` against a new transaction and commits its writes.
    ///
    /// The mutator's error is returned unchanged and nothing is written.
    /// On success the pending writes are committed to the engine in one
    /// atomic batch and then merged into the mirror. A transaction with no
    /// pending writes does not touch the engine.
    ///
    /// The mutator runs under the map's exclusive lock: it must not call
    /// back into this map, and a slow mutator blocks every reader and
    /// writer of the map.
    ///
    /// # Errors
    ///
    /// - The mutator's own error
    /// - [`CoreError::Closed`] if the map was closed
    /// - [`CoreError::Encryption`] if a value cannot be sealed
    /// - [`CoreError::Persist`] if the commit fails; the mirror is unchanged
    ///
    /// # Example
    ///
    /// ```
    /// use duramap_core::{CoreError, Registry};
    ///
    /// let registry = Registry::in_memory();
    /// let map = registry.open_loaded("counters.db", "hits", None).unwrap();
    ///
    /// let total = map
    ///     .update(|tx| {
    ///         let next = tx.get("total").and_then(|v| v.as_integer()).unwrap_or(0) + 1;
    ///         tx.set("total", next);
    ///         Ok::<_, CoreError>(next)
    ///     })
    ///     .unwrap();
    /// assert_eq!(total, 1);
    /// ```
    pub fn update<F, T, E>(&self, mutator: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<CoreError>,
    {
        let mut state = self.state.write();
        let engine = self.engine(&state)?;

        let mut tx = Transaction::new(&state.mirror);
        let output = mutator(&mut tx)?;
        let writes = tx.into_writes();

        if writes.is_empty() {
            return Ok(output);
        }

        let mut batch = WriteBatch::new();
        for (key, write) in &writes {
            match write {
                PendingWrite::Put(value) => {
                    batch.put(key.as_bytes(), encode_record(value, self.cipher.as_ref())?);
                }
                PendingWrite::Delete => batch.delete(key.as_bytes()),
            }
        }

        if let Err(e) = engine.commit(self.name(), batch) {
            warn!(map = self.name(), error = %e, "commit failed, mirror unchanged");
            return Err(CoreError::persist(self.name(), e).into());
        }
        debug!(
            path = %self.path().display(),
            map = self.name(),
            writes = writes.len(),
            "committed"
        );

        for (key, write) in writes {
            match write {
                PendingWrite::Put(value) => {
                    state.mirror.insert(key, value);
                }
                PendingWrite::Delete => {
                    state.mirror.remove(&key);
                }
            }
        }
        Ok(output)
    }

    /// Returns shared access to the mirror.
    ///
    /// Several guards may be held at once; updates wait until all are
    /// dropped.
    pub fn read(&self) -> MirrorGuard<'_> {
        MirrorGuard {
            guard: RwLockReadGuard::map(self.state.read(), |state| &state.mirror),
        }
    }

    /// Calls `reader` with the mirror under the shared lock.
    pub fn with_map<R>(&self, reader: impl FnOnce(&Mirror) -> R) -> R {
        reader(&*self.read())
    }

    /// Calls `reader` with the mirror under the shared lock.
    pub fn do_with_map(&self, reader: impl FnOnce(&Mirror)) {
        reader(&*self.read());
    }

    /// Returns a copy of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    /// Returns true if `key` is set.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns a copy of the whole mirror.
    #[must_use]
    pub fn snapshot(&self) -> Mirror {
        self.read().clone()
    }

    /// Removes every entry, durably.
    ///
    /// The bucket is reset in one atomic engine step before the mirror is
    /// cleared.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Closed`] if the map was closed
    /// - [`CoreError::Persist`] if the reset fails; the mirror is unchanged
    pub fn truncate(&self) -> CoreResult<()> {
        let mut state = self.state.write();
        let engine = self.engine(&state)?;

        if let Err(e) = engine.reset_bucket(self.name()) {
            warn!(map = self.name(), error = %e, "truncate failed, mirror unchanged");
            return Err(CoreError::persist(self.name(), e));
        }

        let removed = state.mirror.len();
        state.mirror.clear();
        info!(path = %self.path().display(), map = self.name(), removed, "truncated map");
        Ok(())
    }

    /// Releases the engine handle and unregisters the map.
    ///
    /// The next open of the same `(path, name)` creates a new instance with
    /// an empty mirror. Closing an already closed map does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Close`] if the final flush or the engine close
    /// fails. The map is closed and unregistered regardless.
    pub fn close(&self) -> CoreResult<()> {
        let registry = self.registry.upgrade();
        let mut maps = registry.as_ref().map(|r| r.maps.lock());

        let Some(engine) = self.state.write().engine.take() else {
            return Ok(());
        };
        let flushed = engine
            .flush()
            .map_err(|e| CoreError::close(self.path(), e));
        drop(engine);

        let mut released = Ok(());
        if let (Some(registry), Some(maps)) = (registry.as_ref(), maps.as_mut()) {
            let registered = maps
                .get(&self.id)
                .is_some_and(|map| std::ptr::eq(Arc::as_ptr(map), self));
            if registered {
                maps.remove(&self.id);
            }
            released = registry.engines.release(self.path());
        }

        info!(path = %self.path().display(), map = self.name(), "closed map");
        flushed.and(released)
    }
}

impl std::fmt::Debug for Duramap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Duramap")
            .field("id", &self.id)
            .field("encrypted", &self.is_encrypted())
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CoreError;
    use crate::registry::Registry;
    use duramap_codec::Value;

    #[test]
    fn example_scenario() {
        let registry = Registry::in_memory();
        let map = registry.open("x.db", "m", None).unwrap();
        map.load().unwrap();
        assert!(map.is_empty());

        map.update(|tx| {
            tx.set("foo", "bar");
            Ok::<_, CoreError>(())
        })
        .unwrap();
        assert_eq!(map.get("foo"), Some(Value::from("bar")));
        assert_eq!(map.len(), 1);

        map.truncate().unwrap();
        assert!(map.with_map(|m| m.is_empty()));
    }

    #[test]
    fn mutator_error_leaves_mirror_untouched() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("x.db", "m", None).unwrap();
        map.update(|tx| {
            tx.set("keep", 1);
            Ok::<_, CoreError>(())
        })
        .unwrap();
        let before = map.snapshot();

        #[derive(Debug)]
        enum AppError {
            Rejected,
            Core(CoreError),
        }
        impl From<CoreError> for AppError {
            fn from(e: CoreError) -> Self {
                Self::Core(e)
            }
        }

        let result: Result<(), AppError> = map.update(|tx| {
            tx.set("keep", 2);
            tx.set("new", 3);
            Err(AppError::Rejected)
        });

        assert!(matches!(result, Err(AppError::Rejected)));
        assert_eq!(map.snapshot(), before);
    }

    #[test]
    fn update_returns_mutator_output() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("x.db", "m", None).unwrap();

        let seen = map
            .update(|tx| {
                tx.set("a", 1);
                Ok::<_, CoreError>(tx.get("a").cloned())
            })
            .unwrap();
        assert_eq!(seen, Some(Value::from(1)));
    }

    #[test]
    fn read_guard_derefs_to_mirror() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("x.db", "m", None).unwrap();
        map.update(|tx| {
            tx.set("a", true);
            Ok::<_, CoreError>(())
        })
        .unwrap();

        let guard = map.read();
        let other = map.read();
        assert_eq!(guard.get("a"), Some(&Value::Bool(true)));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn do_with_map_sees_committed_state() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("x.db", "m", None).unwrap();
        map.update(|tx| {
            tx.set("k", "v");
            tx.set("gone", 0);
            tx.remove("gone");
            Ok::<_, CoreError>(())
        })
        .unwrap();

        let mut keys = Vec::new();
        map.do_with_map(|m| keys.extend(m.keys().cloned()));
        assert_eq!(keys, vec!["k".to_string()]);
    }

    #[test]
    fn closed_map_rejects_mutation_but_keeps_reads() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("x.db", "m", None).unwrap();
        map.update(|tx| {
            tx.set("a", 1);
            Ok::<_, CoreError>(())
        })
        .unwrap();

        map.close().unwrap();
        assert!(map.is_closed());
        assert!(matches!(map.load(), Err(CoreError::Closed { .. })));
        assert!(matches!(map.truncate(), Err(CoreError::Closed { .. })));
        let result = map.update(|tx| {
            tx.set("b", 2);
            Ok::<_, CoreError>(())
        });
        assert!(matches!(result, Err(CoreError::Closed { .. })));

        assert_eq!(map.get("a"), Some(Value::from(1)));
        // Closing again is a no-op
        map.close().unwrap();
    }
}
