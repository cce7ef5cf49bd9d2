//! Transferable objects.
//!
//! The engine never touches concrete asset types. An escrow carries an
//! [`AnyObject`]: the encoded bytes of the asset tagged with its
//! [`ObjectTypeId`]. The object store registered for that type decodes the
//! bytes into a `Box<dyn TransferableObject>` and persists it again after a
//! transfer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, EscrowId, ObjectTypeId, Result};

/// Context handed to an object while it changes hands.
///
/// Objects may stamp it into their own state (e.g. last transfer time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferContext {
    /// The escrow driving the transfer.
    pub escrow_id: EscrowId,
    /// Block time the transfer executes in.
    pub block_time: u64,
}

/// Capability set every escrowable asset implements.
pub trait TransferableObject: fmt::Debug {
    /// Which object store owns this object.
    fn type_id(&self) -> ObjectTypeId;

    /// Primary key within its store.
    fn primary_key(&self) -> Vec<u8>;

    /// Whether `account` currently owns the object.
    fn is_owned_by(&self, account: &Address) -> Result<bool>;

    /// Move ownership from `from` to `to`. Must fail if `from` is not the
    /// current owner.
    fn transfer(&mut self, from: &Address, to: &Address, ctx: &TransferContext) -> Result<()>;

    /// Stateless well-formedness check.
    fn validate(&self) -> Result<()>;

    /// Canonical encoding. Two objects are the same object iff their
    /// encodings are byte-identical.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Wrap the canonical encoding with its type tag.
    fn to_any(&self) -> Result<AnyObject> {
        Ok(AnyObject {
            type_id: self.type_id(),
            value: self.encode()?,
        })
    }
}

/// Type-tagged encoded object, as carried by an escrow record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnyObject {
    pub type_id: ObjectTypeId,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

impl AnyObject {
    #[must_use]
    pub fn new(type_id: ObjectTypeId, value: Vec<u8>) -> Self {
        Self { type_id, value }
    }

    /// Whether `object` encodes to exactly these bytes under the same tag.
    ///
    /// # Errors
    /// Propagates encoding failures from the object.
    pub fn matches(&self, object: &dyn TransferableObject) -> Result<bool> {
        Ok(object.type_id() == self.type_id && object.encode()? == self.value)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Minimal in-crate object used by unit tests and downstream fixtures.
/// **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
pub mod dummy {
    use serde::{Deserialize, Serialize};

    use crate::{Address, EscrowError, ObjectTypeId, Result};

    use super::{TransferContext, TransferableObject};

    /// Type id reserved for [`DummyObject`].
    pub const DUMMY_TYPE: ObjectTypeId = ObjectTypeId(0xffff);

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DummyObject {
        pub key: String,
        pub owner: Address,
    }

    impl DummyObject {
        #[must_use]
        pub fn new(key: &str, owner: Address) -> Self {
            Self {
                key: key.to_string(),
                owner,
            }
        }
    }

    impl TransferableObject for DummyObject {
        fn type_id(&self) -> ObjectTypeId {
            DUMMY_TYPE
        }

        fn primary_key(&self) -> Vec<u8> {
            self.key.as_bytes().to_vec()
        }

        fn is_owned_by(&self, account: &Address) -> Result<bool> {
            Ok(self.owner == *account)
        }

        fn transfer(&mut self, from: &Address, to: &Address, _ctx: &TransferContext) -> Result<()> {
            if self.owner != *from {
                return Err(EscrowError::InvalidObject {
                    reason: format!("{from} does not own {}", self.key),
                });
            }
            self.owner = *to;
            Ok(())
        }

        fn validate(&self) -> Result<()> {
            if self.key.is_empty() {
                return Err(EscrowError::InvalidObject {
                    reason: "empty key".into(),
                });
            }
            self.owner.validate()
        }

        fn encode(&self) -> Result<Vec<u8>> {
            Ok(serde_json::to_vec(self)?)
        }
    }
}
