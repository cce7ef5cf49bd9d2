//! # openescrow-types
//!
//! Shared types, errors, and configuration for the **OpenEscrow** engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`EscrowId`], [`Address`], [`ObjectTypeId`]
//! - **Money**: [`Coin`], [`Coins`]
//! - **Assets**: the [`TransferableObject`] capability and the type-tagged [`AnyObject`]
//! - **Escrow model**: [`Escrow`], [`EscrowState`]
//! - **Messages**: [`EscrowMsg`] and the five lifecycle requests, [`MsgResponse`]
//! - **Snapshots**: [`GenesisState`]
//! - **Configuration**: [`KeeperConfig`], [`FeeConfig`], [`FeeSchedule`]
//! - **Errors**: [`EscrowError`] with `ESC_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod coin;
pub mod config;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod genesis;
pub mod ids;
pub mod msg;
pub mod object;

// Re-export all primary types at crate root for ergonomic imports:
//   use openescrow_types::{Escrow, EscrowState, Coins, Address, ...};

pub use coin::*;
pub use config::*;
pub use error::*;
pub use escrow::*;
pub use genesis::*;
pub use ids::*;
pub use msg::*;
pub use object::{AnyObject, TransferContext, TransferableObject};

// Constants are accessed via `openescrow_types::constants::FOO`
// (not re-exported to avoid name collisions).
