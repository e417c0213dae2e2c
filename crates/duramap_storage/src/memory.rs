//! In-memory storage engine for testing.

use crate::engine::{BatchOp, Record, RecordCursor, StorageEngine, WriteBatch};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

type Bucket = BTreeMap<Vec<u8>, Vec<u8>>;

/// An in-memory storage engine.
///
/// This engine keeps every bucket in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral maps that don't need persistence
///
/// Closing is a no-op, so the same engine can be handed out again after a
/// map is closed and its contents are still there on the next load.
///
/// # Failure injection
///
/// [`fail_writes`](Self::fail_writes) makes every mutating call fail with
/// [`StorageError::Injected`] without touching the stored data, which lets
/// tests exercise persist-failure paths.
///
/// # Example
///
/// ```rust
/// use duramap_storage::{InMemoryEngine, StorageEngine, WriteBatch};
///
/// let engine = InMemoryEngine::new();
/// let mut batch = WriteBatch::new();
/// batch.put(b"k".to_vec(), b"v".to_vec());
/// engine.commit("bucket", batch).unwrap();
///
/// let records: Vec<_> = engine.scan("bucket").unwrap().collect::<Result<_, _>>().unwrap();
/// assert_eq!(records, vec![(b"k".to_vec(), b"v".to_vec())]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    buckets: RwLock<BTreeMap<String, Bucket>>,
    fail_writes: AtomicBool,
}

impl InMemoryEngine {
    /// Creates a new empty in-memory engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of the raw records of a bucket.
    ///
    /// Useful for asserting on what actually reached storage.
    #[must_use]
    pub fn records(&self, bucket: &str) -> Vec<Record> {
        self.buckets
            .read()
            .get(bucket)
            .map(|b| b.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::injected("writes are disabled"));
        }
        Ok(())
    }
}

impl StorageEngine for InMemoryEngine {
    fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.buckets.write().entry(bucket.to_string()).or_default();
        Ok(())
    }

    fn scan(&self, bucket: &str) -> StorageResult<RecordCursor> {
        // Snapshot the bucket so the cursor never holds the lock
        let records = self.records(bucket);
        Ok(RecordCursor::new(records.into_iter().map(Ok)))
    }

    fn commit(&self, bucket: &str, batch: WriteBatch) -> StorageResult<()> {
        self.check_writable()?;

        let mut buckets = self.buckets.write();
        let target = buckets.entry(bucket.to_string()).or_default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    target.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    target.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn reset_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.buckets
            .write()
            .insert(bucket.to_string(), Bucket::new());
        Ok(())
    }

    fn buckets(&self) -> StorageResult<Vec<String>> {
        Ok(self.buckets.read().keys().cloned().collect())
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}
