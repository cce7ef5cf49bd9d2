//! # openescrow-keeper
//!
//! The escrow/auction engine. A [`Keeper`] holds its configuration, the
//! object registry and the payment ledger; all state lives in the
//! [`KvStore`](openescrow_store::KvStore) passed to each call.
//!
//! - [`index`]: primary and deadline indexes, counters
//! - [`Keeper::create_escrow`], [`Keeper::update_escrow`],
//!   [`Keeper::transfer_to_escrow`], [`Keeper::refund_escrow`],
//!   [`Keeper::complete_auction`]: the lifecycle
//! - [`Keeper::begin_block`] / [`Keeper::mark_expired_escrows`]: per-block sweep
//! - [`compute_fee`] / [`Keeper::collect_fees`]: per-operation fees
//! - [`Keeper::check_invariants`]: full-state audit
//! - [`Keeper::deliver_tx`]: one message, fees included, in its own transaction
//!
//! ## Lifecycle of one block
//!
//! ```text
//! begin_block(now)
//!   ├─ last_block_time = now
//!   └─ Open ∧ deadline ≤ now → Expired
//! deliver_tx(msg) × N
//!   ├─ validate_basic → collect fee → operation
//!   └─ commit on Ok, discard on Err
//! ```

pub mod fees;
pub mod genesis;
pub mod handler;
pub mod index;
pub mod invariants;
pub mod keeper;
pub mod query;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testutil;

pub use fees::compute_fee;
pub use invariants::InvariantReport;
pub use keeper::Keeper;
pub use query::{EscrowPage, EscrowQuery};
