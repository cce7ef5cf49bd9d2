//! Coin amounts.
//!
//! A [`Coins`] value is a set of `(denom, amount)` pairs sorted by denom.
//! A *valid* set has unique denoms and strictly positive amounts carrying
//! at most [`AMOUNT_PRECISION`] decimal places.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
    EscrowError, Result,
    constants::{AMOUNT_PRECISION, MAX_DENOM_LEN, MIN_DENOM_LEN},
};

/// A single amount of one denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Decimal,
}

impl Coin {
    #[must_use]
    pub fn new(denom: impl Into<String>, amount: Decimal) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Check denom syntax, positivity and precision.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidCoins`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        validate_denom(&self.denom)?;
        if self.amount <= Decimal::ZERO {
            return Err(EscrowError::InvalidCoins {
                reason: format!("amount of {} must be positive, got {}", self.denom, self.amount),
            });
        }
        if self.amount.scale() > AMOUNT_PRECISION {
            return Err(EscrowError::InvalidCoins {
                reason: format!(
                    "amount {} of {} exceeds {AMOUNT_PRECISION} decimal places",
                    self.amount, self.denom
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Denoms start with a letter and continue with letters, digits or `/:._-`.
///
/// # Errors
/// Returns [`EscrowError::InvalidCoins`] on a malformed denom.
pub fn validate_denom(denom: &str) -> Result<()> {
    let len_ok = (MIN_DENOM_LEN..=MAX_DENOM_LEN).contains(&denom.len());
    let mut chars = denom.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
    if len_ok && first_ok && rest_ok {
        Ok(())
    } else {
        Err(EscrowError::InvalidCoins {
            reason: format!("invalid denom {denom:?}"),
        })
    }
}

/// An ordered set of coins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Build a coin set, sorting by denom. Duplicates are kept so that
    /// [`Coins::validate`] can reject them.
    #[must_use]
    pub fn new(mut coins: Vec<Coin>) -> Self {
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        Self(coins)
    }

    /// A set holding a single coin.
    #[must_use]
    pub fn single(denom: impl Into<String>, amount: Decimal) -> Self {
        Self(vec![Coin::new(denom, amount)])
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    /// Validate as a price or payment: non-empty, sorted, unique, each
    /// coin positive.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidCoins`].
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(EscrowError::InvalidCoins {
                reason: "coin set is empty".into(),
            });
        }
        for coin in &self.0 {
            coin.validate()?;
        }
        for pair in self.0.windows(2) {
            if pair[0].denom >= pair[1].denom {
                return Err(EscrowError::InvalidCoins {
                    reason: format!(
                        "denoms must be sorted and unique: {} before {}",
                        pair[0].denom, pair[1].denom
                    ),
                });
            }
        }
        Ok(())
    }

    /// Amount held of `denom` (zero if absent).
    #[must_use]
    pub fn amount_of(&self, denom: &str) -> Decimal {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map_or(Decimal::ZERO, |c| c.amount)
    }

    /// `true` if for every denom in `other`, `self` holds at least as much.
    #[must_use]
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }

    /// Component-wise sum. Zero entries are dropped.
    #[must_use]
    pub fn add(&self, other: &Coins) -> Coins {
        let mut out: Vec<Coin> = self.0.clone();
        for coin in other.iter() {
            match out.iter_mut().find(|c| c.denom == coin.denom) {
                Some(existing) => existing.amount += coin.amount,
                None => out.push(coin.clone()),
            }
        }
        out.retain(|c| !c.amount.is_zero());
        Coins::new(out)
    }

    /// Component-wise difference, or `None` if any denom would go negative.
    #[must_use]
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        if !self.is_all_gte(other) {
            return None;
        }
        let out = self
            .0
            .iter()
            .map(|c| Coin::new(c.denom.clone(), c.amount - other.amount_of(&c.denom)))
            .filter(|c| !c.amount.is_zero())
            .collect();
        Some(Coins(out))
    }

    /// Multiply every amount by `rate`, truncating toward zero to
    /// [`AMOUNT_PRECISION`] places. Zero results are dropped.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidCoins`] on overflow.
    pub fn mul_truncate(&self, rate: Decimal) -> Result<Coins> {
        let mut out = Vec::with_capacity(self.0.len());
        for coin in &self.0 {
            let product = coin
                .amount
                .checked_mul(rate)
                .ok_or_else(|| EscrowError::InvalidCoins {
                    reason: format!("overflow multiplying {coin} by {rate}"),
                })?
                .round_dp_with_strategy(AMOUNT_PRECISION, RoundingStrategy::ToZero);
            if !product.is_zero() {
                out.push(Coin::new(coin.denom.clone(), product));
            }
        }
        Ok(Coins(out))
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Self(vec![coin])
    }
}
