//! Transaction state.

use crate::types::Mirror;
use duramap_codec::Value;
use std::collections::HashMap;

/// Represents a pending write in a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    /// Insert or overwrite a key.
    Put(Value),
    /// Remove a key.
    Delete,
}

/// An update in progress.
///
/// Created per [`Duramap::update`](crate::Duramap::update) call and borrowed
/// by the mutator. The mirror it reads from cannot change while the
/// transaction exists, since the update holds the map's exclusive lock.
#[derive(Debug)]
pub struct Transaction<'a> {
    /// Committed contents of the map.
    mirror: &'a Mirror,
    /// Pending writes: key -> write operation. Last write per key wins.
    writes: HashMap<String, PendingWrite>,
}

impl<'a> Transaction<'a> {
    /// Creates a new transaction over a mirror.
    pub(crate) fn new(mirror: &'a Mirror) -> Self {
        Self {
            mirror,
            writes: HashMap::new(),
        }
    }

    /// Reads a key, seeing this transaction's own writes first.
    ///
    /// Returns `None` if the key is not set. A key set to null returns
    /// `Some(&Value::Null)`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.writes.get(key) {
            Some(PendingWrite::Put(value)) => Some(value),
            Some(PendingWrite::Delete) => None,
            None => self.mirror.get(key),
        }
    }

    /// Returns true if the key is set, seeing this transaction's own writes.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Stages a write of `value` under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.writes
            .insert(key.into(), PendingWrite::Put(value.into()));
    }

    /// Stages removal of `key`.
    pub fn remove(&mut self, key: impl Into<String>) {
        self.writes.insert(key.into(), PendingWrite::Delete);
    }

    /// Returns the number of keys with a pending write.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.writes.len()
    }

    /// Gets the pending write for a key, if any.
    #[must_use]
    pub fn pending(&self, key: &str) -> Option<&PendingWrite> {
        self.writes.get(key)
    }

    /// Consumes the transaction, returning its pending writes.
    pub(crate) fn into_writes(self) -> HashMap<String, PendingWrite> {
        self.writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror() -> Mirror {
        let mut mirror = Mirror::new();
        mirror.insert("a".into(), Value::from(1));
        mirror.insert("n".into(), Value::Null);
        mirror
    }

    #[test]
    fn reads_fall_through_to_mirror() {
        let mirror = mirror();
        let tx = Transaction::new(&mirror);

        assert_eq!(tx.get("a"), Some(&Value::from(1)));
        assert_eq!(tx.get("missing"), None);
        assert_eq!(tx.pending_len(), 0);
    }

    #[test]
    fn null_is_distinct_from_absent() {
        let mirror = mirror();
        let tx = Transaction::new(&mirror);

        assert_eq!(tx.get("n"), Some(&Value::Null));
        assert!(tx.contains_key("n"));
        assert!(!tx.contains_key("missing"));
    }

    #[test]
    fn pending_writes_shadow_mirror() {
        let mirror = mirror();
        let mut tx = Transaction::new(&mirror);

        tx.set("a", 2);
        tx.set("b", "new");
        assert_eq!(tx.get("a"), Some(&Value::from(2)));
        assert_eq!(tx.get("b"), Some(&Value::from("new")));

        // Mirror is untouched
        assert_eq!(mirror.get("a"), Some(&Value::from(1)));
    }

    #[test]
    fn last_set_wins() {
        let mirror = Mirror::new();
        let mut tx = Transaction::new(&mirror);

        tx.set("k", 1);
        tx.set("k", 2);

        assert_eq!(tx.pending_len(), 1);
        assert_eq!(tx.pending("k"), Some(&PendingWrite::Put(Value::from(2))));
    }

    #[test]
    fn remove_hides_key() {
        let mirror = mirror();
        let mut tx = Transaction::new(&mirror);

        tx.remove("a");
        assert_eq!(tx.get("a"), None);
        assert!(!tx.contains_key("a"));

        tx.set("a", 3);
        assert_eq!(tx.get("a"), Some(&Value::from(3)));

        let writes = tx.into_writes();
        assert_eq!(writes.get("a"), Some(&PendingWrite::Put(Value::from(3))));
    }
}
