//! Persistent storage engine built on sled.

use crate::engine::{BatchOp, Record, RecordCursor, StorageEngine, WriteBatch};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Prefix sled uses for its own internal trees.
const INTERNAL_TREE_PREFIX: &str = "__sled__";

/// How long `open` keeps retrying while a previous handle still holds the
/// database lock.
const LOCK_WAIT: Duration = Duration::from_secs(2);

/// First delay between lock retries; doubled per attempt up to
/// [`MAX_LOCK_RETRY_DELAY`].
const INITIAL_LOCK_RETRY_DELAY: Duration = Duration::from_millis(1);
const MAX_LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Options used when opening a [`SledEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Create missing parent directories of the storage path.
    pub create_dirs: bool,
    /// Flush to disk before `commit`/`reset_bucket` return.
    pub sync_on_commit: bool,
    /// Size of the engine's page cache in bytes.
    pub cache_capacity: u64,
    /// Interval of the engine's background flusher, if any.
    pub flush_every_ms: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            create_dirs: true,
            sync_on_commit: true,
            cache_capacity: 64 * 1024 * 1024, // 64 MB
            flush_every_ms: None,
        }
    }
}

/// A file-backed storage engine.
///
/// Each bucket is a sled tree inside one sled database. The database at a
/// given path may only be opened once per process at a time; a second open
/// fails because sled holds an exclusive file lock.
///
/// # Durability
///
/// Batches are applied with sled's atomic batch API. With
/// `sync_on_commit` set (the default) the engine is flushed before
/// `commit` returns, so acknowledged writes survive a crash.
///
/// # Example
///
/// ```no_run
/// use duramap_storage::{EngineOptions, SledEngine, StorageEngine, WriteBatch};
/// use std::path::Path;
///
/// let engine = SledEngine::open(Path::new("data.db"), &EngineOptions::default()).unwrap();
/// engine.ensure_bucket("settings").unwrap();
///
/// let mut batch = WriteBatch::new();
/// batch.put(b"theme".to_vec(), b"dark".to_vec());
/// engine.commit("settings", batch).unwrap();
/// ```
#[derive(Debug)]
pub struct SledEngine {
    path: PathBuf,
    db: RwLock<Option<sled::Db>>,
    sync_on_commit: bool,
}

impl SledEngine {
    /// Opens or creates an engine at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the path cannot be created, is not
    /// a valid database, or is locked by another handle.
    pub fn open(path: &Path, options: &EngineOptions) -> StorageResult<Self> {
        if options.create_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::open(path, e.to_string()))?;
            }
        }

        let config = sled::Config::new()
            .path(path)
            .cache_capacity(options.cache_capacity)
            .flush_every_ms(options.flush_every_ms);
        let db = open_with_lock_retry(&config, path)?;

        debug!(
            path = %path.display(),
            recovered = db.was_recovered(),
            "opened sled engine"
        );

        Ok(Self {
            path: path.to_path_buf(),
            db: RwLock::new(Some(db)),
            sync_on_commit: options.sync_on_commit,
        })
    }

    /// Returns the path of the underlying database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tree(&self, bucket: &str) -> StorageResult<sled::Tree> {
        let db = self.db.read();
        let db = db.as_ref().ok_or(StorageError::Closed)?;
        Ok(db.open_tree(bucket)?)
    }

    fn sync(&self, tree: &sled::Tree) -> StorageResult<()> {
        if self.sync_on_commit {
            tree.flush()?;
        }
        Ok(())
    }
}

/// Opens the database, waiting out a lock still held by a handle that was
/// just closed.
///
/// sled releases its file lock only once its background work has dropped
/// the last reference to the database, which can lag behind `close`.
fn open_with_lock_retry(config: &sled::Config, path: &Path) -> StorageResult<sled::Db> {
    let deadline = Instant::now() + LOCK_WAIT;
    let mut delay = INITIAL_LOCK_RETRY_DELAY;
    let mut attempts = 0u32;

    loop {
        match config.open() {
            Ok(db) => {
                if attempts > 0 {
                    debug!(path = %path.display(), attempts, "acquired database lock after retry");
                }
                return Ok(db);
            }
            Err(e) if is_lock_contention(&e) && Instant::now() < deadline => {
                attempts += 1;
                std::thread::sleep(delay);
                delay = (delay * 2).min(MAX_LOCK_RETRY_DELAY);
            }
            Err(e) => {
                if is_lock_contention(&e) {
                    warn!(path = %path.display(), attempts, "database lock still held, giving up");
                }
                return Err(StorageError::open(path, e.to_string()));
            }
        }
    }
}

/// Returns true if the error is sled failing to take the database lock.
fn is_lock_contention(error: &sled::Error) -> bool {
    match error {
        sled::Error::Io(io) => {
            io.kind() == std::io::ErrorKind::WouldBlock
                || io.to_string().contains("could not acquire lock")
        }
        _ => false,
    }
}

impl StorageEngine for SledEngine {
    fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        let tree = self.tree(bucket)?;
        self.sync(&tree)
    }

    fn scan(&self, bucket: &str) -> StorageResult<RecordCursor> {
        let db = self.db.read();
        let db = db.as_ref().ok_or(StorageError::Closed)?;

        let exists = db
            .tree_names()
            .iter()
            .any(|name| name.as_ref() == bucket.as_bytes());
        if !exists {
            return Ok(RecordCursor::empty());
        }

        let iter = db.open_tree(bucket)?.iter().map(|item| {
            item.map(|(key, value)| -> Record { (key.to_vec(), value.to_vec()) })
                .map_err(StorageError::from)
        });
        Ok(RecordCursor::new(iter))
    }

    fn commit(&self, bucket: &str, batch: WriteBatch) -> StorageResult<()> {
        let tree = self.tree(bucket)?;

        let mut sled_batch = sled::Batch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => sled_batch.insert(key, value),
                BatchOp::Delete { key } => sled_batch.remove(key),
            }
        }

        tree.apply_batch(sled_batch)?;
        self.sync(&tree)
    }

    fn reset_bucket(&self, bucket: &str) -> StorageResult<()> {
        let tree = self.tree(bucket)?;

        let mut sled_batch = sled::Batch::default();
        for key in tree.iter().keys() {
            sled_batch.remove(key?);
        }

        tree.apply_batch(sled_batch)?;
        self.sync(&tree)
    }

    fn buckets(&self) -> StorageResult<Vec<String>> {
        let db = self.db.read();
        let db = db.as_ref().ok_or(StorageError::Closed)?;

        Ok(db
            .tree_names()
            .iter()
            .filter_map(|name| std::str::from_utf8(name).ok())
            .filter(|name| !name.starts_with(INTERNAL_TREE_PREFIX))
            .map(str::to_string)
            .collect())
    }

    fn flush(&self) -> StorageResult<()> {
        let db = self.db.read();
        let db = db.as_ref().ok_or(StorageError::Closed)?;
        db.flush()?;
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        let mut db = self.db.write();
        if let Some(db) = db.take() {
            db.flush()?;
            debug!(path = %self.path.display(), "closed sled engine");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn collect(engine: &SledEngine, bucket: &str) -> Vec<Record> {
        engine
            .scan(bucket)
            .unwrap()
            .collect::<StorageResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let engine = SledEngine::open(&path, &EngineOptions::default()).unwrap();
        assert!(path.exists());
        assert_eq!(engine.path(), path.as_path());
        assert!(engine.buckets().unwrap().is_empty());
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("path").join("test.db");

        SledEngine::open(&path, &EngineOptions::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn file_commit_and_scan_in_key_order() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(&dir.path().join("test.db"), &EngineOptions::default())
            .unwrap();
        engine.ensure_bucket("m").unwrap();

        let mut batch = WriteBatch::new();
        batch.put(b"b".to_vec(), b"2".to_vec());
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"c".to_vec(), b"3".to_vec());
        batch.delete(b"c".to_vec());
        engine.commit("m", batch).unwrap();

        assert_eq!(
            collect(&engine, "m"),
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec())
            ]
        );
    }

    #[test]
    fn file_scan_missing_bucket_is_empty() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(&dir.path().join("test.db"), &EngineOptions::default())
            .unwrap();

        assert!(collect(&engine, "absent").is_empty());
        assert!(engine.buckets().unwrap().is_empty());
    }

    #[test]
    fn file_buckets_are_independent() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(&dir.path().join("test.db"), &EngineOptions::default())
            .unwrap();

        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"one".to_vec());
        engine.commit("one", batch).unwrap();
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"two".to_vec());
        engine.commit("two", batch).unwrap();

        engine.reset_bucket("one").unwrap();

        assert!(collect(&engine, "one").is_empty());
        assert_eq!(collect(&engine, "two").len(), 1);

        let mut names = engine.buckets().unwrap();
        names.sort();
        assert_eq!(names, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let engine = SledEngine::open(&path, &EngineOptions::default()).unwrap();
            let mut batch = WriteBatch::new();
            batch.put(b"key".to_vec(), b"persistent data".to_vec());
            engine.commit("m", batch).unwrap();
            engine.close().unwrap();
        }

        {
            let engine = SledEngine::open(&path, &EngineOptions::default()).unwrap();
            assert_eq!(
                collect(&engine, "m"),
                vec![(b"key".to_vec(), b"persistent data".to_vec())]
            );
        }
    }

    #[test]
    fn file_reopen_after_close_in_a_loop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        for i in 0..50u32 {
            let engine = SledEngine::open(&path, &EngineOptions::default()).unwrap();
            assert_eq!(collect(&engine, "m").len(), i as usize);

            let mut batch = WriteBatch::new();
            batch.put(format!("k{i:03}").into_bytes(), b"v".to_vec());
            engine.commit("m", batch).unwrap();
            engine.close().unwrap();
        }
    }

    #[test]
    fn lock_contention_is_recognised() {
        let locked = sled::Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "could not acquire lock on \"db\"",
        ));
        assert!(is_lock_contention(&locked));

        let would_block = sled::Error::Io(std::io::ErrorKind::WouldBlock.into());
        assert!(is_lock_contention(&would_block));

        let other = sled::Error::Io(std::io::ErrorKind::NotFound.into());
        assert!(!is_lock_contention(&other));
        assert!(!is_lock_contention(&sled::Error::Unsupported("x".into())));
    }

    #[test]
    fn file_operations_after_close_fail() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(&dir.path().join("test.db"), &EngineOptions::default())
            .unwrap();
        engine.close().unwrap();
        // Closing twice is harmless
        engine.close().unwrap();

        assert!(matches!(engine.ensure_bucket("m"), Err(StorageError::Closed)));
        assert!(matches!(engine.scan("m"), Err(StorageError::Closed)));
        assert!(matches!(engine.flush(), Err(StorageError::Closed)));
    }
}
