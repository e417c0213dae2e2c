//! Test fixtures and map helpers.
//!
//! Provides convenience functions for setting up test maps
//! and common test scenarios.

use duramap_core::{Config, CoreError, Duramap, Registry, SecretKey};
use duramap_storage::{InMemoryEngine, StorageEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Name used for fixture maps.
pub const TEST_MAP_NAME: &str = "test";

/// A loaded test map with automatic cleanup.
pub struct TestMap {
    /// The registry the map was opened through.
    pub registry: Registry,
    /// The map instance.
    pub map: Arc<Duramap>,
    path: PathBuf,
    secret: Option<SecretKey>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestMap {
    /// Creates a new in-memory test map.
    pub fn memory() -> Self {
        Self::open(Registry::in_memory(), PathBuf::from("memory.db"), None, None)
    }

    /// Creates an in-memory test map and returns its engine, for failure
    /// injection and raw record inspection.
    pub fn memory_with_engine() -> (Self, Arc<InMemoryEngine>) {
        let engine = Arc::new(InMemoryEngine::new());
        let shared = Arc::clone(&engine);
        let registry = Registry::with_opener(Config::default(), move |_path: &Path| {
            Ok(Arc::clone(&shared) as Arc<dyn StorageEngine>)
        });
        let fixture = Self::open(registry, PathBuf::from("memory.db"), None, None);
        (fixture, engine)
    }

    /// Creates a new test map stored in a temporary directory.
    pub fn file() -> Self {
        Self::file_with_secret(None)
    }

    /// Creates a new encrypted test map stored in a temporary directory.
    pub fn encrypted_file(secret: SecretKey) -> Self {
        Self::file_with_secret(Some(secret))
    }

    fn file_with_secret(secret: Option<SecretKey>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.duramap");
        Self::open(Registry::new(Config::default()), path, secret, Some(temp_dir))
    }

    fn open(
        registry: Registry,
        path: PathBuf,
        secret: Option<SecretKey>,
        temp_dir: Option<TempDir>,
    ) -> Self {
        let map = registry
            .open_loaded(&path, TEST_MAP_NAME, secret.clone())
            .expect("Failed to open test map");
        Self {
            registry,
            map,
            path,
            secret,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the storage path of the map.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the map and opens a fresh, loaded instance of it.
    pub fn reopen(&mut self) {
        self.map.close().expect("Failed to close test map");
        self.map = self
            .registry
            .open_loaded(&self.path, TEST_MAP_NAME, self.secret.clone())
            .expect("Failed to reopen test map");
    }
}

impl std::ops::Deref for TestMap {
    type Target = Duramap;

    fn deref(&self) -> &Self::Target {
        &self.map
    }
}

/// Runs a test with a temporary in-memory map.
///
/// # Example
///
/// ```rust
/// use duramap_testkit::with_temp_map;
///
/// with_temp_map(|map| {
///     assert!(map.is_empty());
/// });
/// ```
pub fn with_temp_map<F, R>(f: F) -> R
where
    F: FnOnce(&Duramap) -> R,
{
    let fixture = TestMap::memory();
    f(&fixture.map)
}

/// Runs a test with a temporary file-backed map.
pub fn with_file_map<F, R>(f: F) -> R
where
    F: FnOnce(&Duramap, &Path) -> R,
{
    let fixture = TestMap::file();
    f(&fixture.map, fixture.path())
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a map holding `count` integer entries `key_0..key_{count-1}`.
    pub fn populated_map(count: usize) -> TestMap {
        let fixture = TestMap::memory();
        fixture
            .update(|tx| {
                for i in 0..count {
                    tx.set(format!("key_{i}"), i as i64);
                }
                Ok::<_, CoreError>(())
            })
            .expect("Failed to populate map");
        fixture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duramap_core::Value;

    #[test]
    fn test_memory_map() {
        let fixture = TestMap::memory();
        assert!(fixture.is_empty());
        assert_eq!(fixture.name(), TEST_MAP_NAME);
    }

    #[test]
    fn test_with_temp_map() {
        let len = with_temp_map(|map| map.len());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_populated_scenario() {
        let fixture = scenarios::populated_map(10);
        assert_eq!(fixture.len(), 10);
        assert_eq!(fixture.get("key_3"), Some(Value::from(3)));
    }

    #[test]
    fn test_reopen_file_map() {
        let mut fixture = TestMap::file();
        fixture
            .update(|tx| {
                tx.set("k", "v");
                Ok::<_, CoreError>(())
            })
            .unwrap();

        let before = Arc::clone(&fixture.map);
        fixture.reopen();

        assert!(!Arc::ptr_eq(&before, &fixture.map));
        assert_eq!(fixture.get("k"), Some(Value::from("v")));
    }
}
