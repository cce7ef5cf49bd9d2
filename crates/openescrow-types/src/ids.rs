//! Identifiers used throughout OpenEscrow.
//!
//! Escrow ids are assigned from a monotonic counter and rendered as fixed
//! width hex so that their textual and byte orderings agree. Addresses are
//! raw 20-byte account keys with an `esc1` textual prefix.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::{
    EscrowError, Result,
    constants::{ADDRESS_LEN, ADDRESS_PREFIX, ESCROW_ID_BYTES, ESCROW_ID_HEX_LEN},
};

// ---------------------------------------------------------------------------
// EscrowId
// ---------------------------------------------------------------------------

/// Escrow identifier. Stored as the 8-byte big-endian encoding of the
/// counter value, displayed as 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct EscrowId(pub u64);

impl EscrowId {
    /// The first id ever assigned.
    pub const FIRST: Self = Self(1);

    /// The following id, or `None` once the counter is exhausted.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Raw key bytes. Big-endian so lexicographic order equals numeric order.
    #[must_use]
    pub fn to_bytes(self) -> [u8; ESCROW_ID_BYTES] {
        self.0.to_be_bytes()
    }

    /// Decode raw key bytes.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidEscrowId`] if `bytes` is not exactly
    /// [`ESCROW_ID_BYTES`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; ESCROW_ID_BYTES] = bytes
            .try_into()
            .map_err(|_| EscrowError::InvalidEscrowId(hex::encode(bytes)))?;
        Ok(Self(u64::from_be_bytes(raw)))
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for EscrowId {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != ESCROW_ID_HEX_LEN {
            return Err(EscrowError::InvalidEscrowId(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|_| EscrowError::InvalidEscrowId(s.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for EscrowId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EscrowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Account address (20 raw bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Deterministic address of a module-owned account.
    ///
    /// Derived as the first 20 bytes of `SHA-256("module:" || name)`, so
    /// nobody holds a key for it.
    #[must_use]
    pub fn module(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"module:");
        hasher.update(name.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&hash[..ADDRESS_LEN]);
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// The all-zero address is never a valid account.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Reject the zero address.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidAddress`] for the zero address.
    pub fn validate(&self) -> Result<()> {
        if self.is_zero() {
            return Err(EscrowError::InvalidAddress(self.to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ADDRESS_PREFIX}{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| EscrowError::InvalidAddress(s.to_string()))?;
        let bytes = hex::decode(body).map_err(|_| EscrowError::InvalidAddress(s.to_string()))?;
        let raw: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| EscrowError::InvalidAddress(s.to_string()))?;
        Ok(Self(raw))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Deterministic and random fixtures. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// Address whose every byte is `seed`.
    #[must_use]
    pub fn from_seed(seed: u8) -> Self {
        Self([seed; ADDRESS_LEN])
    }

    /// Fresh random non-zero address.
    #[must_use]
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; ADDRESS_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes[0] |= 1;
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// ObjectTypeId
// ---------------------------------------------------------------------------

/// Tag selecting which object store owns a transferable object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct ObjectTypeId(pub u32);

impl ObjectTypeId {
    #[must_use]
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ObjectTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
