//! Storage engine trait definition.

use crate::error::StorageResult;

/// A stored key/value pair.
pub type Record = (Vec<u8>, Vec<u8>);

/// An embedded, ordered key-value engine with named buckets.
///
/// Engines are **opaque byte stores**. They know nothing about values,
/// encryption, or mirrors; Duramap owns all interpretation of the bytes.
///
/// # Invariants
///
/// - `commit` is all-or-nothing: either every operation of the batch is
///   applied or none is
/// - After `commit` or `reset_bucket` returns `Ok`, the change survives a
///   process crash when the engine syncs on commit
/// - `scan` yields records in ascending bytewise key order
/// - Engines must be `Send + Sync`; one engine may serve several buckets
///   from different threads
///
/// # Implementors
///
/// - [`super::SledEngine`] - For persistent storage
/// - [`super::InMemoryEngine`] - For testing
pub trait StorageEngine: Send + Sync {
    /// Creates the bucket if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot create the bucket.
    fn ensure_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Opens an ordered cursor over every record of the bucket.
    ///
    /// A bucket that does not exist yields no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be opened. Errors met while
    /// advancing are yielded by the cursor itself.
    fn scan(&self, bucket: &str) -> StorageResult<RecordCursor>;

    /// Applies a batch of writes to the bucket atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be made durable. In that case
    /// no operation of the batch is visible.
    fn commit(&self, bucket: &str, batch: WriteBatch) -> StorageResult<()>;

    /// Removes every record of the bucket in one atomic step.
    ///
    /// The bucket itself keeps existing.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset could not be made durable.
    fn reset_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Lists the buckets stored in this engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot enumerate its buckets.
    fn buckets(&self) -> StorageResult<Vec<String>>;

    /// Flushes buffered writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&self) -> StorageResult<()>;

    /// Flushes and releases the underlying storage.
    ///
    /// Later calls on a closed engine fail with
    /// [`StorageError::Closed`](crate::StorageError::Closed).
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    fn close(&self) -> StorageResult<()>;
}

/// A single operation within a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a record.
    Put {
        /// Record key.
        key: Vec<u8>,
        /// Record value.
        value: Vec<u8>,
    },
    /// Delete a record if present.
    Delete {
        /// Record key.
        key: Vec<u8>,
    },
}

/// An ordered set of writes applied atomically by [`StorageEngine::commit`].
///
/// Operations are applied in insertion order, so a later operation on the
/// same key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Stages a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    /// Returns the number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the staged operations in order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consumes the batch, returning its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Ordered cursor over the records of one bucket.
pub struct RecordCursor {
    inner: Box<dyn Iterator<Item = StorageResult<Record>>>,
}

impl RecordCursor {
    /// Wraps an iterator of records.
    pub fn new<I>(inner: I) -> Self
    where
        I: Iterator<Item = StorageResult<Record>> + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }

    /// A cursor with no records.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

impl Iterator for RecordCursor {
    type Item = StorageResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl std::fmt::Debug for RecordCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCursor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_keeps_insertion_order() {
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());

        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.delete(b"b".to_vec());
        batch.put(b"a".to_vec(), b"2".to_vec());

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.ops()[2],
            BatchOp::Put {
                key: b"a".to_vec(),
                value: b"2".to_vec()
            }
        );
        assert_eq!(batch.into_ops()[1], BatchOp::Delete { key: b"b".to_vec() });
    }

    #[test]
    fn empty_cursor_yields_nothing() {
        assert_eq!(RecordCursor::empty().count(), 0);
    }
}
