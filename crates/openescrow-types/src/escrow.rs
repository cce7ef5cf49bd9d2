//! # Escrow: the custody record
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐  sweep, now ≥ deadline  ┌─────────┐
//!   │ OPEN ├────────────────────────▶│ EXPIRED │
//!   └─┬──┬─┘                         └────┬────┘
//!     │  │ refund / auction w/o bidder    │ refund
//!     │  └──────────────┐  ┌──────────────┘
//!     │ purchase /      ▼  ▼
//!     │ auction    ┌──────────┐
//!     ▼ w/ bidder  │ REFUNDED │  (deleted)
//!   ┌───────────┐  └──────────┘
//!   │ COMPLETED │  (deleted)
//!   └───────────┘
//! ```
//!
//! Completed and Refunded are terminal: the record is removed from the
//! store in the same operation that sets them.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, AnyObject, Coins, EscrowError, EscrowId, Result, TransferableObject};

/// Lifecycle state of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowState {
    /// Awaiting payment or auction settlement.
    Open,
    /// Deadline passed; the asset stays in custody until refunded, or until
    /// an auction with a bidder is settled.
    Expired,
    /// Asset delivered to the buyer, price delivered to the seller.
    Completed,
    /// Asset returned to the seller.
    Refunded,
}

impl EscrowState {
    /// Can an escrow in this state move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Expired | Self::Completed | Self::Refunded)
                | (Self::Expired, Self::Completed | Self::Refunded)
        )
    }

    /// Whether the record still holds an asset in custody.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Open | Self::Expired)
    }
}

impl fmt::Display for EscrowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// An escrow: a seller's asset held in custody against a price and deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    /// Account currently controlling the terms.
    pub seller: Address,
    /// Encoded asset, tagged with the store that owns it.
    pub object: AnyObject,
    pub price: Coins,
    pub state: EscrowState,
    /// Unix seconds. The escrow expires once block time reaches it.
    pub deadline: u64,
    pub is_auction: bool,
    /// Last qualifying bidder (auctions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<Address>,
    /// Fraction of the price paid to the broker, in `[0, 1)`.
    #[serde(default)]
    pub broker_commission: Decimal,
}

impl Escrow {
    /// Full validation, used when a record is first created.
    ///
    /// Runs [`Escrow::validate_without_deadline_and_object`] and then checks
    /// that `object` is the record's asset, is well-formed and is owned by
    /// the seller, and that the deadline lies after `now`.
    ///
    /// # Errors
    /// The first failing check's error.
    pub fn validate(&self, object: &dyn TransferableObject, now: u64) -> Result<()> {
        self.validate_without_deadline_and_object()?;
        self.validate_object(object)?;
        self.validate_deadline(now)
    }

    /// Field-level validation that does not depend on where the asset
    /// currently sits or on the clock. Used for genesis import and updates.
    ///
    /// # Errors
    /// The first failing check's error.
    pub fn validate_without_deadline_and_object(&self) -> Result<()> {
        self.seller.validate()?;
        self.price.validate()?;
        if let Some(buyer) = &self.buyer {
            buyer.validate()?;
            if !self.is_auction {
                return Err(EscrowError::InvalidAddress(format!(
                    "escrow {} records a bidder but is not an auction",
                    self.id
                )));
            }
        }
        self.validate_commission()
    }

    /// Check the record's deadline against `now`.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidDeadline`] if `deadline <= now`.
    pub fn validate_deadline(&self, now: u64) -> Result<()> {
        if self.deadline <= now {
            return Err(EscrowError::InvalidDeadline {
                deadline: self.deadline,
                now,
            });
        }
        Ok(())
    }

    fn validate_object(&self, object: &dyn TransferableObject) -> Result<()> {
        if !self.object.matches(object)? {
            return Err(EscrowError::InvalidObject {
                reason: format!("object does not match escrow {} record", self.id),
            });
        }
        object.validate()?;
        if !object.is_owned_by(&self.seller)? {
            return Err(EscrowError::InvalidObject {
                reason: format!("object is not owned by seller {}", self.seller),
            });
        }
        Ok(())
    }

    fn validate_commission(&self) -> Result<()> {
        let rate = self.broker_commission;
        if rate < Decimal::ZERO || rate >= Decimal::ONE {
            return Err(EscrowError::InvalidCommission {
                reason: format!("commission {rate} must be in [0, 1)"),
            });
        }
        match &self.broker {
            Some(broker) => {
                broker.validate()?;
                if !self.is_auction {
                    return Err(EscrowError::InvalidCommission {
                        reason: "only auctions may name a broker".into(),
                    });
                }
            }
            None if !rate.is_zero() => {
                return Err(EscrowError::InvalidCommission {
                    reason: "commission set without a broker".into(),
                });
            }
            None => {}
        }
        Ok(())
    }

    /// Deadline as a UTC timestamp, for logs and display.
    #[must_use]
    pub fn deadline_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.deadline)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Whether `now` has reached the deadline.
    #[must_use]
    pub fn is_past_deadline(&self, now: u64) -> bool {
        now >= self.deadline
    }

    /// Attempt a state transition.
    ///
    /// # Errors
    /// Returns [`EscrowError::EscrowNotOpen`] for a forbidden transition.
    pub fn transition(&mut self, target: EscrowState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(EscrowError::EscrowNotOpen {
                id: self.id,
                state: self.state,
            });
        }
        self.state = target;
        Ok(())
    }
}

/// Fixture builder for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Escrow {
    /// An open fixed-price escrow selling `object` for `price`.
    #[must_use]
    pub fn dummy(
        id: EscrowId,
        seller: Address,
        object: AnyObject,
        price: Coins,
        deadline: u64,
    ) -> Self {
        Self {
            id,
            seller,
            object,
            price,
            state: EscrowState::Open,
            deadline,
            is_auction: false,
            buyer: None,
            broker: None,
            broker_commission: Decimal::ZERO,
        }
    }
}
