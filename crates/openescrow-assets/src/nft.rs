//! Non-fungible token: the reference asset kind.

use openescrow_store::KvStore;
use openescrow_types::{
    Address, EscrowError, EscrowId, ObjectTypeId, Result, TransferContext, TransferableObject,
};
use serde::{Deserialize, Serialize};

use crate::ObjectStore;

/// Type id the NFT store is registered under.
pub const NFT_TYPE: ObjectTypeId = ObjectTypeId(1);

/// A token identified by `(class_id, token_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    pub class_id: String,
    pub token_id: String,
    pub owner: Address,
    #[serde(default)]
    pub uri: String,
    /// Block time of the last ownership change.
    #[serde(default)]
    pub updated_at: u64,
    /// Escrow that drove the last ownership change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_escrow: Option<EscrowId>,
}

impl Nft {
    #[must_use]
    pub fn new(class_id: &str, token_id: &str, owner: Address) -> Self {
        Self {
            class_id: class_id.to_string(),
            token_id: token_id.to_string(),
            owner,
            uri: String::new(),
            updated_at: 0,
            last_escrow: None,
        }
    }

    #[must_use]
    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }
}

impl TransferableObject for Nft {
    fn type_id(&self) -> ObjectTypeId {
        NFT_TYPE
    }

    fn primary_key(&self) -> Vec<u8> {
        format!("{}/{}", self.class_id, self.token_id).into_bytes()
    }

    fn is_owned_by(&self, account: &Address) -> Result<bool> {
        Ok(self.owner == *account)
    }

    fn transfer(&mut self, from: &Address, to: &Address, ctx: &TransferContext) -> Result<()> {
        if self.owner != *from {
            return Err(EscrowError::InvalidObject {
                reason: format!(
                    "nft {}/{} is owned by {}, not {from}",
                    self.class_id, self.token_id, self.owner
                ),
            });
        }
        to.validate()?;
        self.owner = *to;
        self.updated_at = ctx.block_time;
        self.last_escrow = Some(ctx.escrow_id);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("class_id", &self.class_id), ("token_id", &self.token_id)] {
            if value.is_empty() || value.contains('/') {
                return Err(EscrowError::InvalidObject {
                    reason: format!("nft {name} {value:?} must be non-empty and contain no '/'"),
                });
            }
        }
        self.owner.validate()
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// [`ObjectStore`] for [`Nft`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct NftStore;

impl NftStore {
    /// Create a new token. Fails if the id is taken.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidObject`] for a malformed or duplicate token.
    pub fn mint(&self, store: &mut dyn KvStore, nft: &Nft) -> Result<()> {
        if self.has(store, &nft.primary_key()) {
            return Err(EscrowError::InvalidObject {
                reason: format!("nft {}/{} already exists", nft.class_id, nft.token_id),
            });
        }
        self.write(store, nft)?;
        tracing::debug!(class = %nft.class_id, token = %nft.token_id, owner = %nft.owner, "Minted nft");
        Ok(())
    }

    /// Typed read.
    ///
    /// # Errors
    /// Returns [`EscrowError::Serialization`] on a corrupt entry.
    pub fn get(&self, store: &dyn KvStore, class_id: &str, token_id: &str) -> Result<Option<Nft>> {
        let key = format!("{class_id}/{token_id}");
        store
            .get(&crate::object_key(NFT_TYPE, key.as_bytes()))
            .map(|bytes| decode_nft(&bytes))
            .transpose()
    }
}

fn decode_nft(bytes: &[u8]) -> Result<Nft> {
    serde_json::from_slice(bytes).map_err(|e| EscrowError::Serialization(format!("nft: {e}")))
}

impl ObjectStore for NftStore {
    fn type_id(&self) -> ObjectTypeId {
        NFT_TYPE
    }

    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn TransferableObject>> {
        Ok(Box::new(decode_nft(bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use openescrow_store::MemStore;

    use super::*;

    fn ctx() -> TransferContext {
        TransferContext {
            escrow_id: EscrowId(7),
            block_time: 1_000,
        }
    }

    #[test]
    fn transfer_stamps_context() {
        let (alice, bob) = (Address::from_seed(1), Address::from_seed(2));
        let mut nft = Nft::new("punks", "1", alice);
        nft.transfer(&alice, &bob, &ctx()).unwrap();
        assert_eq!(nft.owner, bob);
        assert_eq!(nft.updated_at, 1_000);
        assert_eq!(nft.last_escrow, Some(EscrowId(7)));
    }

    #[test]
    fn transfer_from_non_owner_fails() {
        let mut nft = Nft::new("punks", "1", Address::from_seed(1));
        let err = nft
            .transfer(&Address::from_seed(3), &Address::from_seed(2), &ctx())
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidObject { .. }));
        assert_eq!(nft.owner, Address::from_seed(1));
    }

    #[test]
    fn validate_rejects_bad_ids() {
        assert!(Nft::new("", "1", Address::from_seed(1)).validate().is_err());
        assert!(Nft::new("a/b", "1", Address::from_seed(1)).validate().is_err());
        assert!(Nft::new("punks", "1", Address([0; 20])).validate().is_err());
        assert!(Nft::new("punks", "1", Address::from_seed(1)).validate().is_ok());
    }

    #[test]
    fn mint_and_get() {
        let mut store = MemStore::new();
        let nft = Nft::new("punks", "1", Address::from_seed(1)).with_uri("ipfs://x");
        NftStore.mint(&mut store, &nft).unwrap();
        assert_eq!(NftStore.get(&store, "punks", "1").unwrap(), Some(nft.clone()));
        assert!(NftStore.mint(&mut store, &nft).is_err());
    }

    #[test]
    fn decode_roundtrips_through_the_store_trait() {
        let nft = Nft::new("punks", "1", Address::from_seed(1));
        let bytes = nft.encode().unwrap();
        let any = NftStore.decode(&bytes).unwrap();
        assert_eq!(any.encode().unwrap(), bytes);
        assert_eq!(any.primary_key(), b"punks/1".to_vec());
    }
}
