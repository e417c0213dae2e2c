//! Registries that deduplicate engine handles and map instances.
//!
//! A [`Registry`] is an explicit object, not process-wide state: tests and
//! embedders create as many isolated registries as they need. Clones share
//! the same tables.

mod engines;

pub use engines::{EngineOpener, EngineRegistry};
pub(crate) use engines::normalize_path;

use crate::config::Config;
use crate::crypto::{Cipher, SecretKey};
use crate::error::{CoreError, CoreResult};
use crate::map::Duramap;
use crate::types::MapId;
use duramap_storage::{InMemoryEngine, SledEngine, StorageEngine, StorageResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared state behind a [`Registry`].
///
/// Lock order: `maps`, then a map's own state lock, then `engines`.
pub(crate) struct RegistryInner {
    config: Config,
    pub(crate) engines: EngineRegistry,
    pub(crate) maps: Mutex<HashMap<MapId, Arc<Duramap>>>,
}

/// Hands out one live [`Duramap`] per `(path, name)`.
///
/// # Example
///
/// ```
/// use duramap_core::{CoreError, Registry};
///
/// let registry = Registry::in_memory();
/// let map = registry.open_loaded("x.db", "m", None).unwrap();
///
/// map.update(|tx| {
///     tx.set("foo", "bar");
///     Ok::<_, CoreError>(())
/// })
/// .unwrap();
///
/// assert_eq!(map.get("foo").unwrap().as_text(), Some("bar"));
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Creates a registry that stores maps on disk with sled.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let options = config.to_engine_options();
        Self::with_opener(config, move |path: &Path| {
            let engine = SledEngine::open(path, &options)?;
            Ok(Arc::new(engine) as Arc<dyn StorageEngine>)
        })
    }

    /// Creates a registry whose maps live in memory.
    ///
    /// Data written under a path stays available to later opens of the same
    /// path through this registry (and its clones), including after close.
    #[must_use]
    pub fn in_memory() -> Self {
        let engines: Mutex<HashMap<PathBuf, Arc<InMemoryEngine>>> = Mutex::default();
        Self::with_opener(Config::default(), move |path: &Path| {
            let engine = Arc::clone(engines.lock().entry(path.to_path_buf()).or_default());
            Ok(engine as Arc<dyn StorageEngine>)
        })
    }

    /// Creates a registry with a custom engine opener.
    ///
    /// The opener receives the normalized absolute path.
    pub fn with_opener<F>(config: Config, opener: F) -> Self
    where
        F: Fn(&Path) -> StorageResult<Arc<dyn StorageEngine>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                engines: EngineRegistry::new(Arc::new(opener)),
                maps: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the configuration of this registry.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the live map for `(path, name)`, creating it if needed.
    ///
    /// A newly created map has an empty mirror; call
    /// [`Duramap::load`] (or use [`open_loaded`](Self::open_loaded)) to read
    /// the stored contents.
    ///
    /// # Errors
    ///
    /// - [`CoreError::StorageOpen`] if the storage file cannot be opened
    /// - [`CoreError::SecretConflict`] if the map is already open with a
    ///   different secret, or one map is encrypted and the other is not
    pub fn open(
        &self,
        path: impl AsRef<Path>,
        name: &str,
        secret: Option<SecretKey>,
    ) -> CoreResult<Arc<Duramap>> {
        let path = normalize_path(path.as_ref())?;
        let id = MapId::new(path, name);
        let fingerprint = secret.as_ref().map(SecretKey::fingerprint);

        let mut maps = self.inner.maps.lock();

        if let Some(existing) = maps.get(&id) {
            if existing.secret_fingerprint() != fingerprint.as_deref() {
                warn!(
                    path = %id.path().display(),
                    map = id.name(),
                    "refusing to reopen map with a different secret"
                );
                return Err(CoreError::secret_conflict(id.path(), id.name()));
            }
            debug!(path = %id.path().display(), map = id.name(), "reusing open map");
            return Ok(Arc::clone(existing));
        }

        let engine = self.inner.engines.acquire(id.path())?;
        let cipher = secret.as_ref().map(Cipher::new);

        info!(
            path = %id.path().display(),
            map = id.name(),
            key = fingerprint.as_deref().unwrap_or("none"),
            "opened map"
        );

        let map = Arc::new(Duramap::new(
            Arc::downgrade(&self.inner),
            id.clone(),
            engine,
            cipher,
            fingerprint,
        ));
        maps.insert(id, Arc::clone(&map));
        Ok(map)
    }

    /// Opens the map and loads its stored contents.
    ///
    /// If loading fails the map stays registered (with an empty mirror) so
    /// the caller can retry [`Duramap::load`] or close it.
    ///
    /// # Errors
    ///
    /// Any error of [`open`](Self::open) or [`Duramap::load`].
    pub fn open_loaded(
        &self,
        path: impl AsRef<Path>,
        name: &str,
        secret: Option<SecretKey>,
    ) -> CoreResult<Arc<Duramap>> {
        let map = self.open(path, name, secret)?;
        map.load()?;
        Ok(map)
    }

    /// Returns true if a live map exists for `(path, name)`.
    #[must_use]
    pub fn is_open(&self, path: impl AsRef<Path>, name: &str) -> bool {
        normalize_path(path.as_ref())
            .is_ok_and(|path| self.inner.maps.lock().contains_key(&MapId::new(path, name)))
    }

    /// Returns the number of live maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.maps.lock().len()
    }

    /// Returns true if no map is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.maps.lock().is_empty()
    }

    /// Returns the engine handle registry.
    #[must_use]
    pub fn engines(&self) -> &EngineRegistry {
        &self.inner.engines
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.inner.config)
            .field("maps", &self.len())
            .field("engines", &self.inner.engines)
            .finish()
    }
}
