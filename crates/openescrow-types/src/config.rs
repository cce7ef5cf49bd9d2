//! Configuration types for the escrow keeper.
//!
//! Configuration is passed explicitly into the keeper's constructor;
//! nothing is looked up from process-global state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, EscrowError, OperationKind, Result, coin::validate_denom, constants};

/// Source of per-operation fee rates.
pub trait FeeSchedule {
    /// Rate configured for one operation, before the floor is applied.
    fn fee_rate(&self, kind: OperationKind) -> Decimal;

    /// Minimum rate charged for any operation.
    fn default_floor_rate(&self) -> Decimal;

    /// Denomination fees are paid in.
    fn fee_denomination(&self) -> &str;

    /// Price of one fee coin in rate units.
    fn fee_coin_price(&self) -> Decimal;
}

/// Per-operation fee table.
///
/// The charged amount for an operation is
/// `max(rate(op), default_fee) / fee_coin_price`, in `fee_denom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    pub fee_denom: String,
    pub fee_coin_price: Decimal,
    /// Floor applied to every operation's rate.
    pub default_fee: Decimal,
    pub create_escrow: Decimal,
    pub update_escrow: Decimal,
    pub transfer_to_escrow: Decimal,
    pub refund_escrow: Decimal,
    pub complete_auction: Decimal,
}

impl FeeConfig {
    /// A schedule that never charges anything.
    #[must_use]
    pub fn free() -> Self {
        Self {
            fee_denom: "ufee".to_string(),
            fee_coin_price: Decimal::ONE,
            default_fee: Decimal::ZERO,
            create_escrow: Decimal::ZERO,
            update_escrow: Decimal::ZERO,
            transfer_to_escrow: Decimal::ZERO,
            refund_escrow: Decimal::ZERO,
            complete_auction: Decimal::ZERO,
        }
    }

    /// # Errors
    /// Returns [`EscrowError::Configuration`] for a non-positive coin price,
    /// a negative rate or a malformed denom.
    pub fn validate(&self) -> Result<()> {
        validate_denom(&self.fee_denom)
            .map_err(|e| EscrowError::Configuration(format!("fee_denom: {e}")))?;
        if self.fee_coin_price <= Decimal::ZERO {
            return Err(EscrowError::Configuration(format!(
                "fee_coin_price must be positive, got {}",
                self.fee_coin_price
            )));
        }
        let rates = [
            ("default_fee", self.default_fee),
            ("create_escrow", self.create_escrow),
            ("update_escrow", self.update_escrow),
            ("transfer_to_escrow", self.transfer_to_escrow),
            ("refund_escrow", self.refund_escrow),
            ("complete_auction", self.complete_auction),
        ];
        for (name, rate) in rates {
            if rate < Decimal::ZERO {
                return Err(EscrowError::Configuration(format!(
                    "{name} must not be negative, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_denom: "ufee".to_string(),
            fee_coin_price: Decimal::ONE,
            default_fee: Decimal::ONE,
            create_escrow: Decimal::new(10, 0),
            update_escrow: Decimal::ONE,
            transfer_to_escrow: Decimal::new(5, 0),
            refund_escrow: Decimal::ONE,
            complete_auction: Decimal::new(5, 0),
        }
    }
}

impl FeeSchedule for FeeConfig {
    fn fee_rate(&self, kind: OperationKind) -> Decimal {
        match kind {
            OperationKind::CreateEscrow => self.create_escrow,
            OperationKind::UpdateEscrow => self.update_escrow,
            OperationKind::TransferToEscrow => self.transfer_to_escrow,
            OperationKind::RefundEscrow => self.refund_escrow,
            OperationKind::CompleteAuction => self.complete_auction,
        }
    }

    fn default_floor_rate(&self) -> Decimal {
        self.default_fee
    }

    fn fee_denomination(&self) -> &str {
        &self.fee_denom
    }

    fn fee_coin_price(&self) -> Decimal {
        self.fee_coin_price
    }
}

/// Configuration for an escrow keeper instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Name the custody account address is derived from.
    pub module_name: String,
    /// Name the fee-collection account address is derived from.
    pub fee_collector_name: String,
    /// Page size used when a query passes `limit = 0`.
    pub default_query_limit: usize,
    /// Largest page a query may request.
    pub max_query_limit: usize,
    pub fees: FeeConfig,
}

impl KeeperConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    /// Returns [`EscrowError::Configuration`] on malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EscrowError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`EscrowError::Configuration`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.module_name.is_empty() || self.fee_collector_name.is_empty() {
            return Err(EscrowError::Configuration(
                "module and fee collector names must be set".into(),
            ));
        }
        if self.module_name == self.fee_collector_name {
            return Err(EscrowError::Configuration(
                "custody and fee collector accounts must differ".into(),
            ));
        }
        if self.default_query_limit == 0 || self.default_query_limit > self.max_query_limit {
            return Err(EscrowError::Configuration(format!(
                "default_query_limit {} must be in 1..={}",
                self.default_query_limit, self.max_query_limit
            )));
        }
        self.fees.validate()
    }

    /// Account that holds escrowed assets and in-flight funds.
    #[must_use]
    pub fn custody_address(&self) -> Address {
        Address::module(&self.module_name)
    }

    /// Account fees are credited to.
    #[must_use]
    pub fn fee_collector_address(&self) -> Address {
        Address::module(&self.fee_collector_name)
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            module_name: constants::ESCROW_MODULE_NAME.to_string(),
            fee_collector_name: constants::FEE_COLLECTOR_NAME.to_string(),
            default_query_limit: constants::DEFAULT_QUERY_LIMIT,
            max_query_limit: constants::MAX_QUERY_LIMIT,
            fees: FeeConfig::default(),
        }
    }
}
