//! JSON value codec for typed records kept in a [`KvStore`].

use openescrow_types::{EscrowError, Result};
use serde::{Serialize, de::DeserializeOwned};

use crate::KvStore;

/// Encode a record to its stored byte form.
///
/// # Errors
/// Returns [`EscrowError::Serialization`].
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| EscrowError::Serialization(e.to_string()))
}

/// # Errors
/// Returns [`EscrowError::Serialization`] on malformed bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        EscrowError::Serialization(format!("{e} (value {})", hex::encode(bytes)))
    })
}

/// Read and decode the record at `key`, if any.
///
/// # Errors
/// Returns [`EscrowError::Serialization`] if the stored bytes do not decode.
pub fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> Result<Option<T>> {
    store.get(key).map(|bytes| decode(&bytes)).transpose()
}

/// Encode and write `value` at `key`.
///
/// # Errors
/// Returns [`EscrowError::Serialization`].
pub fn save<T: Serialize>(store: &mut dyn KvStore, key: &[u8], value: &T) -> Result<()> {
    store.set(key, encode(value)?);
    Ok(())
}
