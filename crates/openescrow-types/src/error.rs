//! Error types for the OpenEscrow engine.
//!
//! All errors use the `ESC_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by class:
//! - 1xx: Validation errors
//! - 2xx: Not-found errors
//! - 3xx: Authorization errors
//! - 4xx: Lifecycle state errors
//! - 5xx: Payment / fee errors
//! - 6xx: Store / codec / configuration errors
//! - 9xx: Invariant faults (fatal for the current transaction)

use thiserror::Error;

use crate::{EscrowId, EscrowState, ObjectTypeId};

/// Coarse classification used by callers to decide how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    State,
    Payment,
    Store,
    Fault,
}

/// Central error enum for all OpenEscrow operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The escrow id is not 16 hex characters / 8 bytes.
    #[error("ESC_ERR_100: Invalid escrow id: {0}")]
    InvalidEscrowId(String),

    /// The address could not be parsed or is the zero address.
    #[error("ESC_ERR_101: Invalid address: {0}")]
    InvalidAddress(String),

    /// A coin set is empty, unsorted, duplicated or non-positive.
    #[error("ESC_ERR_102: Invalid coins: {reason}")]
    InvalidCoins { reason: String },

    /// The deadline is not after the current block time.
    #[error("ESC_ERR_103: Invalid deadline {deadline}: must be after {now}")]
    InvalidDeadline { deadline: u64, now: u64 },

    /// The object is malformed or not owned by the expected account.
    #[error("ESC_ERR_104: Invalid object: {reason}")]
    InvalidObject { reason: String },

    /// The escrow state is not acceptable in this context.
    #[error("ESC_ERR_105: Invalid escrow state: {0}")]
    InvalidState(EscrowState),

    /// An update carried no field to change.
    #[error("ESC_ERR_106: Empty update: at least one of seller, price or deadline must be set")]
    EmptyUpdate,

    /// The broker / commission pair is inconsistent.
    #[error("ESC_ERR_107: Invalid broker commission: {reason}")]
    InvalidCommission { reason: String },

    /// Pagination or filter parameters are out of range.
    #[error("ESC_ERR_108: Invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// Genesis / imported state is inconsistent.
    #[error("ESC_ERR_109: Invalid genesis: {reason}")]
    InvalidGenesis { reason: String },

    // =================================================================
    // Not-found Errors (2xx)
    // =================================================================
    /// No escrow with this id is stored.
    #[error("ESC_ERR_200: Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// The object is absent from its store or differs from the stored copy.
    #[error("ESC_ERR_201: Unknown object: {reason}")]
    UnknownObject { reason: String },

    /// No object store is registered for this type id.
    #[error("ESC_ERR_202: No object store registered for {0}")]
    UnknownObjectType(ObjectTypeId),

    // =================================================================
    // Authorization Errors (3xx)
    // =================================================================
    /// The sender is not allowed to perform this operation.
    #[error("ESC_ERR_300: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The buyer tried to purchase their own escrow.
    #[error("ESC_ERR_301: Buyer cannot be the seller of escrow {0}")]
    BuyerIsSeller(EscrowId),

    // =================================================================
    // Lifecycle State Errors (4xx)
    // =================================================================
    /// The escrow exists but is not in the state the operation requires.
    #[error("ESC_ERR_400: Escrow {id} is {state}, operation not allowed")]
    EscrowNotOpen { id: EscrowId, state: EscrowState },

    /// The escrow's deadline has passed.
    #[error("ESC_ERR_401: Escrow {0} has expired")]
    EscrowExpired(EscrowId),

    /// Deadlines may only be extended.
    #[error("ESC_ERR_402: Deadline cannot be shortened from {old} to {new}")]
    DeadlineShortened { old: u64, new: u64 },

    /// The operation only applies to auctions.
    #[error("ESC_ERR_403: Escrow {0} is not an auction")]
    NotAnAuction(EscrowId),

    /// Auctions cannot be bought at a fixed price.
    #[error("ESC_ERR_404: Escrow {0} is an auction and cannot be bought directly")]
    AuctionNotPurchasable(EscrowId),

    // =================================================================
    // Payment / Fee Errors (5xx)
    // =================================================================
    /// An account does not hold enough coins for a transfer.
    #[error("ESC_ERR_500: Insufficient funds: {account} needs {needed}, has {available}")]
    InsufficientFunds {
        account: String,
        needed: String,
        available: String,
    },

    /// The offered amount does not cover the price.
    #[error("ESC_ERR_501: Insufficient payment: price {price}, offered {offered}")]
    InsufficientPayment { price: String, offered: String },

    /// A fee could not be computed.
    #[error("ESC_ERR_502: Fee computation failed: {reason}")]
    FeeComputation { reason: String },

    // =================================================================
    // Store / Codec / Configuration Errors (6xx)
    // =================================================================
    /// Serialization / deserialization error.
    #[error("ESC_ERR_600: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("ESC_ERR_601: Configuration error: {0}")]
    Configuration(String),

    // =================================================================
    // Invariant Faults (9xx)
    // =================================================================
    /// A consistency invariant does not hold.
    #[error("ESC_ERR_900: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Stored state contradicts the engine's own bookkeeping.
    #[error("ESC_ERR_901: Corrupted state: {reason}")]
    CorruptedState { reason: String },

    /// A transfer failed after payment was collected.
    #[error("ESC_ERR_902: Swap failed for escrow {id}: {reason}")]
    SwapFailed { id: EscrowId, reason: String },

    /// Unrecoverable internal error.
    #[error("ESC_ERR_903: Internal error: {0}")]
    Internal(String),
}

impl EscrowError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEscrowId(_)
            | Self::InvalidAddress(_)
            | Self::InvalidCoins { .. }
            | Self::InvalidDeadline { .. }
            | Self::InvalidObject { .. }
            | Self::InvalidState(_)
            | Self::EmptyUpdate
            | Self::InvalidCommission { .. }
            | Self::InvalidQuery { .. }
            | Self::InvalidGenesis { .. } => ErrorKind::Validation,
            Self::EscrowNotFound(_) | Self::UnknownObject { .. } | Self::UnknownObjectType(_) => {
                ErrorKind::NotFound
            }
            Self::Unauthorized { .. } | Self::BuyerIsSeller(_) => ErrorKind::Unauthorized,
            Self::EscrowNotOpen { .. }
            | Self::EscrowExpired(_)
            | Self::DeadlineShortened { .. }
            | Self::NotAnAuction(_)
            | Self::AuctionNotPurchasable(_) => ErrorKind::State,
            Self::InsufficientFunds { .. }
            | Self::InsufficientPayment { .. }
            | Self::FeeComputation { .. } => ErrorKind::Payment,
            Self::Serialization(_) | Self::Configuration(_) => ErrorKind::Store,
            Self::InvariantViolation { .. }
            | Self::CorruptedState { .. }
            | Self::SwapFailed { .. }
            | Self::Internal(_) => ErrorKind::Fault,
        }
    }

    /// Whether the error means the engine's own preconditions were broken.
    /// The surrounding transaction must be aborted as a whole.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fault
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

impl From<serde_json::Error> for EscrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
