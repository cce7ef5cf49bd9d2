//! Request / response messages for the five lifecycle operations.
//!
//! Every message names its signer and may name a distinct fee payer.
//! `validate_basic` runs the stateless checks a transaction decoder would
//! run before the message ever reaches the keeper.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, AnyObject, Coins, EscrowError, EscrowId, Result};

/// Which lifecycle operation a message triggers. Selects the fee rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    CreateEscrow,
    UpdateEscrow,
    TransferToEscrow,
    RefundEscrow,
    CompleteAuction,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateEscrow => write!(f, "CREATE_ESCROW"),
            Self::UpdateEscrow => write!(f, "UPDATE_ESCROW"),
            Self::TransferToEscrow => write!(f, "TRANSFER_TO_ESCROW"),
            Self::RefundEscrow => write!(f, "REFUND_ESCROW"),
            Self::CompleteAuction => write!(f, "COMPLETE_AUCTION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateEscrow {
    pub seller: Address,
    #[serde(default)]
    pub fee_payer: Option<Address>,
    /// The caller's snapshot of the asset. Re-checked against its store.
    pub object: AnyObject,
    pub price: Coins,
    pub deadline: u64,
    #[serde(default)]
    pub is_auction: bool,
    #[serde(default)]
    pub broker: Option<Address>,
    #[serde(default)]
    pub broker_commission: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateEscrow {
    pub id: EscrowId,
    pub updater: Address,
    #[serde(default)]
    pub fee_payer: Option<Address>,
    #[serde(default)]
    pub seller: Option<Address>,
    #[serde(default)]
    pub price: Option<Coins>,
    #[serde(default)]
    pub deadline: Option<u64>,
}

impl MsgUpdateEscrow {
    /// Whether any field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seller.is_none() && self.price.is_none() && self.deadline.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTransferToEscrow {
    pub id: EscrowId,
    pub buyer: Address,
    #[serde(default)]
    pub fee_payer: Option<Address>,
    /// Upper bound the buyer is willing to pay. Only the price is taken.
    pub amount: Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRefundEscrow {
    pub id: EscrowId,
    pub sender: Address,
    #[serde(default)]
    pub fee_payer: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCompleteAuction {
    pub id: EscrowId,
    pub sender: Address,
    #[serde(default)]
    pub fee_payer: Option<Address>,
}

/// Any lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowMsg {
    CreateEscrow(MsgCreateEscrow),
    UpdateEscrow(MsgUpdateEscrow),
    TransferToEscrow(MsgTransferToEscrow),
    RefundEscrow(MsgRefundEscrow),
    CompleteAuction(MsgCompleteAuction),
}

impl EscrowMsg {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateEscrow(_) => OperationKind::CreateEscrow,
            Self::UpdateEscrow(_) => OperationKind::UpdateEscrow,
            Self::TransferToEscrow(_) => OperationKind::TransferToEscrow,
            Self::RefundEscrow(_) => OperationKind::RefundEscrow,
            Self::CompleteAuction(_) => OperationKind::CompleteAuction,
        }
    }

    /// The account that signed the message.
    #[must_use]
    pub fn signer(&self) -> Address {
        match self {
            Self::CreateEscrow(m) => m.seller,
            Self::UpdateEscrow(m) => m.updater,
            Self::TransferToEscrow(m) => m.buyer,
            Self::RefundEscrow(m) => m.sender,
            Self::CompleteAuction(m) => m.sender,
        }
    }

    /// The account debited for fees: the explicit payer, else the signer.
    #[must_use]
    pub fn fee_payer(&self) -> Address {
        self.explicit_fee_payer().unwrap_or_else(|| self.signer())
    }

    fn explicit_fee_payer(&self) -> Option<Address> {
        match self {
            Self::CreateEscrow(m) => m.fee_payer,
            Self::UpdateEscrow(m) => m.fee_payer,
            Self::TransferToEscrow(m) => m.fee_payer,
            Self::RefundEscrow(m) => m.fee_payer,
            Self::CompleteAuction(m) => m.fee_payer,
        }
    }

    /// Stateless checks.
    ///
    /// # Errors
    /// The first malformed field's error.
    pub fn validate_basic(&self) -> Result<()> {
        self.signer().validate()?;
        if let Some(payer) = self.explicit_fee_payer() {
            payer.validate()?;
        }
        match self {
            Self::CreateEscrow(m) => {
                m.price.validate()?;
                if m.object.value.is_empty() {
                    return Err(EscrowError::InvalidObject {
                        reason: "empty object payload".into(),
                    });
                }
                Ok(())
            }
            Self::UpdateEscrow(m) => {
                if m.is_empty() {
                    return Err(EscrowError::EmptyUpdate);
                }
                if let Some(seller) = &m.seller {
                    seller.validate()?;
                }
                if let Some(price) = &m.price {
                    price.validate()?;
                }
                Ok(())
            }
            Self::TransferToEscrow(m) => m.amount.validate(),
            Self::RefundEscrow(_) | Self::CompleteAuction(_) => Ok(()),
        }
    }
}

/// Result of a successfully delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgResponse {
    /// Set for `CreateEscrow`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escrow_id: Option<EscrowId>,
    /// Fee debited from the fee payer.
    pub fee_paid: Coins,
}
