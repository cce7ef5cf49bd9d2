//! # openescrow-assets
//!
//! The collaborators the escrow keeper moves value through:
//!
//! - [`PaymentLedger`] / [`Bank`]: coin balances per account
//! - [`ObjectStore`]: adapter over the persisted objects of one asset kind
//! - [`ObjectRegistry`]: immutable `type_id → store` table built at startup
//! - [`Nft`] / [`NftStore`]: the reference asset kind

pub mod bank;
pub mod nft;
pub mod object_store;
pub mod registry;

pub use bank::{BANK_PREFIX, Bank, PaymentLedger};
pub use nft::{NFT_TYPE, Nft, NftStore};
pub use object_store::{OBJECT_PREFIX, ObjectStore, object_key};
pub use registry::ObjectRegistry;
