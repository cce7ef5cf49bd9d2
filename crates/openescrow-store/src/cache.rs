//! Write-buffering branch over a parent store.
//!
//! A [`CacheStore`] records writes and deletes without touching its parent
//! until [`CacheStore::commit`] is called. Dropping it discards everything.
//! [`run_tx`] wraps one unit of work: commit on `Ok`, discard on `Err`.

use std::collections::BTreeMap;

use crate::kv::{KvPairs, KvStore, bounds};

pub struct CacheStore<'a> {
    parent: &'a mut dyn KvStore,
    /// `None` marks a pending delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Flush buffered writes into the parent.
    pub fn commit(self) {
        let Self { parent, writes } = self;
        for (key, value) in writes {
            match value {
                Some(value) => parent.set(&key, value),
                None => parent.delete(&key),
            }
        }
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> KvPairs {
        let Some(range) = bounds(start, end) else {
            return Vec::new();
        };
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.range(start, end).into_iter().collect();
        for (key, value) in self.writes.range::<[u8], _>(range) {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }
}

/// Run `f` against a fresh branch of `store`. The branch is committed only
/// if `f` returns `Ok`, so a failed operation leaves `store` untouched.
///
/// # Errors
/// Whatever `f` returns.
pub fn run_tx<T, E, F>(store: &mut dyn KvStore, f: F) -> Result<T, E>
where
    F: FnOnce(&mut dyn KvStore) -> Result<T, E>,
{
    let mut branch = CacheStore::new(store);
    match f(&mut branch) {
        Ok(value) => {
            tracing::debug!(writes = branch.pending(), "Committing transaction branch");
            branch.commit();
            Ok(value)
        }
        Err(e) => {
            tracing::debug!(writes = branch.pending(), "Discarding transaction branch");
            Err(e)
        }
    }
}
