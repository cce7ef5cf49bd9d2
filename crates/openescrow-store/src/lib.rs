//! # openescrow-store
//!
//! The state backend shared by the asset stores and the escrow keeper:
//!
//! - [`KvStore`]: byte-keyed ordered store with snapshot range scans
//! - [`MemStore`]: in-memory implementation
//! - [`CacheStore`] / [`run_tx`]: transaction branches that commit or discard
//!   as a unit
//! - [`codec`]: JSON encoding of typed records

pub mod cache;
pub mod codec;
pub mod kv;

pub use cache::{CacheStore, run_tx};
pub use kv::{KvPairs, KvStore, MemStore, join_key, prefix_end};
