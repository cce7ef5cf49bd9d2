//! Per-operation fees.
//!
//! ```text
//! fee(op) = max(rate(op), floor) / fee_coin_price   (truncated, in fee_denom)
//! ```
//!
//! Fees are debited from the fee payer to the fee-collector account before
//! the operation runs. A fee that cannot be paid aborts the operation.

use openescrow_store::KvStore;
use openescrow_types::{
    Address, Coins, EscrowError, FeeSchedule, OperationKind, Result, constants::AMOUNT_PRECISION,
};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::Keeper;

/// Fee charged for one operation. Empty when the schedule charges nothing.
///
/// # Errors
/// Returns [`EscrowError::FeeComputation`] for a non-positive coin price,
/// a negative rate or an overflow.
pub fn compute_fee(schedule: &dyn FeeSchedule, kind: OperationKind) -> Result<Coins> {
    let rate = schedule.fee_rate(kind).max(schedule.default_floor_rate());
    if rate < Decimal::ZERO {
        return Err(EscrowError::FeeComputation {
            reason: format!("negative rate {rate} for {kind}"),
        });
    }
    let price = schedule.fee_coin_price();
    if price <= Decimal::ZERO {
        return Err(EscrowError::FeeComputation {
            reason: format!("fee coin price must be positive, got {price}"),
        });
    }
    let amount = rate
        .checked_div(price)
        .ok_or_else(|| EscrowError::FeeComputation {
            reason: format!("overflow dividing {rate} by {price}"),
        })?
        .round_dp_with_strategy(AMOUNT_PRECISION, RoundingStrategy::ToZero)
        .normalize();
    if amount.is_zero() {
        return Ok(Coins::empty());
    }
    Ok(Coins::single(schedule.fee_denomination(), amount))
}

impl Keeper {
    /// Compute and debit the fee for `kind` from `payer`.
    ///
    /// # Errors
    /// - [`EscrowError::FeeComputation`] from [`compute_fee`]
    /// - [`EscrowError::InsufficientFunds`] if `payer` cannot cover it
    pub fn collect_fees(&self, store: &mut dyn KvStore, payer: &Address, kind: OperationKind) -> Result<Coins> {
        let fee = compute_fee(&self.config().fees, kind)?;
        if fee.is_empty() {
            return Ok(fee);
        }
        self.ledger()
            .send(store, payer, &self.fee_collector_address(), &fee)?;
        tracing::debug!(payer = %payer, op = %kind, fee = %fee, "Collected fee");
        Ok(fee)
    }
}
