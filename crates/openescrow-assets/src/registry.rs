//! Immutable lookup table from [`ObjectTypeId`] to its [`ObjectStore`].
//!
//! Built once at startup and handed to the keeper. Resolution never falls
//! back to a default store: an unregistered type is an error.

use std::collections::HashMap;

use openescrow_store::KvStore;
use openescrow_types::{AnyObject, EscrowError, ObjectTypeId, Result, TransferableObject};

use crate::ObjectStore;

pub struct ObjectRegistry {
    stores: HashMap<ObjectTypeId, Box<dyn ObjectStore>>,
}

impl ObjectRegistry {
    /// Build a registry from its stores.
    ///
    /// # Errors
    /// Returns [`EscrowError::Configuration`] if two stores claim one type.
    pub fn new(stores: Vec<Box<dyn ObjectStore>>) -> Result<Self> {
        let mut map = HashMap::with_capacity(stores.len());
        for store in stores {
            let type_id = store.type_id();
            if map.insert(type_id, store).is_some() {
                return Err(EscrowError::Configuration(format!(
                    "object store for {type_id} registered twice"
                )));
            }
        }
        Ok(Self { stores: map })
    }

    /// # Errors
    /// Returns [`EscrowError::UnknownObjectType`] for an unregistered type.
    pub fn get(&self, type_id: ObjectTypeId) -> Result<&dyn ObjectStore> {
        self.stores
            .get(&type_id)
            .map(AsRef::as_ref)
            .ok_or(EscrowError::UnknownObjectType(type_id))
    }

    /// Registered type ids, ascending.
    #[must_use]
    pub fn type_ids(&self) -> Vec<ObjectTypeId> {
        let mut ids: Vec<_> = self.stores.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Decode `any` with its store and confirm the store holds exactly that
    /// object. A caller's snapshot is only trusted if the stored copy under
    /// the same primary key encodes to identical bytes.
    ///
    /// # Errors
    /// - [`EscrowError::UnknownObjectType`] for an unregistered type
    /// - [`EscrowError::UnknownObject`] if the object is absent or differs
    pub fn load_checked(&self, store: &dyn KvStore, any: &AnyObject) -> Result<Box<dyn TransferableObject>> {
        let object_store = self.get(any.type_id)?;
        let claimed = object_store.decode(&any.value)?;
        let key = claimed.primary_key();
        let stored = object_store
            .read(store, &key)?
            .ok_or_else(|| EscrowError::UnknownObject {
                reason: format!("{} object {} not in store", any.type_id, hex_key(&key)),
            })?;
        if !any.matches(stored.as_ref())? {
            return Err(EscrowError::UnknownObject {
                reason: format!(
                    "{} object {} differs from the stored copy",
                    any.type_id,
                    hex_key(&key)
                ),
            });
        }
        Ok(stored)
    }

    /// Persist `object` through the store registered for its type.
    ///
    /// # Errors
    /// Returns [`EscrowError::UnknownObjectType`] or the store's write error.
    pub fn write(&self, store: &mut dyn KvStore, object: &dyn TransferableObject) -> Result<()> {
        self.get(object.type_id())?.write(store, object)
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("types", &self.type_ids())
            .finish()
    }
}

fn hex_key(key: &[u8]) -> String {
    String::from_utf8(key.to_vec()).unwrap_or_else(|_| format!("0x{}", hex::encode(key)))
}

#[cfg(test)]
mod tests {
    use openescrow_store::MemStore;
    use openescrow_types::{
        Address,
        object::dummy::{DUMMY_TYPE, DummyObject},
    };

    use super::*;
    use crate::object_store::tests::DummyStore;

    fn registry() -> ObjectRegistry {
        ObjectRegistry::new(vec![Box::new(DummyStore) as Box<dyn ObjectStore>]).unwrap()
    }

    #[test]
    fn duplicate_registration_rejected() {
        let stores: Vec<Box<dyn ObjectStore>> = vec![Box::new(DummyStore), Box::new(DummyStore)];
        let err = ObjectRegistry::new(stores).unwrap_err();
        assert!(matches!(err, EscrowError::Configuration(_)));
    }

    #[test]
    fn unknown_type_rejected() {
        let err = registry().get(ObjectTypeId(42)).err().unwrap();
        assert!(matches!(err, EscrowError::UnknownObjectType(ObjectTypeId(42))));
    }

    #[test]
    fn load_checked_accepts_matching_snapshot() {
        let mut store = MemStore::new();
        let reg = registry();
        let obj = DummyObject::new("k1", Address::from_seed(1));
        reg.write(&mut store, &obj).unwrap();
        let loaded = reg.load_checked(&store, &obj.to_any().unwrap()).unwrap();
        assert_eq!(loaded.type_id(), DUMMY_TYPE);
        assert!(loaded.is_owned_by(&Address::from_seed(1)).unwrap());
    }

    #[test]
    fn load_checked_rejects_stale_snapshot() {
        let mut store = MemStore::new();
        let reg = registry();
        let stale = DummyObject::new("k1", Address::from_seed(1));
        let current = DummyObject::new("k1", Address::from_seed(2));
        reg.write(&mut store, &current).unwrap();
        let err = reg.load_checked(&store, &stale.to_any().unwrap()).unwrap_err();
        assert!(matches!(err, EscrowError::UnknownObject { .. }));
    }

    #[test]
    fn load_checked_rejects_missing_object() {
        let store = MemStore::new();
        let obj = DummyObject::new("k1", Address::from_seed(1));
        let err = registry()
            .load_checked(&store, &obj.to_any().unwrap())
            .unwrap_err();
        assert!(matches!(err, EscrowError::UnknownObject { .. }));
    }
}
