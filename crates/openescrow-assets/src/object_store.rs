//! Per-type object stores.
//!
//! Every asset kind gets one [`ObjectStore`] that knows how to decode its
//! encoded form. Objects live under `0x20 | type_id | primary_key` and are
//! stored in their canonical encoding, so a stored object and a caller's
//! snapshot are the same object iff their bytes are equal.

use openescrow_store::{KvStore, join_key};
use openescrow_types::{EscrowError, ObjectTypeId, Result, TransferableObject};

/// Key prefix for all object stores.
pub const OBJECT_PREFIX: u8 = 0x20;

/// Storage key of the object `primary_key` in the store for `type_id`.
#[must_use]
pub fn object_key(type_id: ObjectTypeId, primary_key: &[u8]) -> Vec<u8> {
    join_key(&[&[OBJECT_PREFIX], &type_id.to_bytes(), primary_key])
}

/// Adapter over the persisted objects of one asset kind.
pub trait ObjectStore {
    fn type_id(&self) -> ObjectTypeId;

    /// Decode an object of this kind from its canonical encoding.
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn TransferableObject>>;

    /// Read the object stored under `primary_key`.
    fn read(&self, store: &dyn KvStore, primary_key: &[u8]) -> Result<Option<Box<dyn TransferableObject>>> {
        store
            .get(&object_key(self.type_id(), primary_key))
            .map(|bytes| self.decode(&bytes))
            .transpose()
    }

    /// Persist `object`, replacing any previous version.
    fn write(&self, store: &mut dyn KvStore, object: &dyn TransferableObject) -> Result<()> {
        if object.type_id() != self.type_id() {
            return Err(EscrowError::InvalidObject {
                reason: format!(
                    "{} object written to the {} store",
                    object.type_id(),
                    self.type_id()
                ),
            });
        }
        object.validate()?;
        store.set(&object_key(self.type_id(), &object.primary_key()), object.encode()?);
        Ok(())
    }

    fn has(&self, store: &dyn KvStore, primary_key: &[u8]) -> bool {
        store.has(&object_key(self.type_id(), primary_key))
    }

    /// Every stored object of this kind, in key order.
    fn iterate(&self, store: &dyn KvStore) -> Result<Vec<Box<dyn TransferableObject>>> {
        let prefix = join_key(&[&[OBJECT_PREFIX], &self.type_id().to_bytes()]);
        store
            .prefix_range(&prefix)
            .into_iter()
            .map(|(_, bytes)| self.decode(&bytes))
            .collect()
    }
}
