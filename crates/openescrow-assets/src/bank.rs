//! Coin balances kept in the shared store.
//!
//! One entry per `(account, denom)` under the bank prefix. Moves are
//! checked in full before any balance changes, so a failed move leaves
//! every balance untouched.

use openescrow_store::{KvStore, codec, join_key};
use openescrow_types::{Address, Coin, Coins, EscrowError, Result, constants::ADDRESS_LEN};
use rust_decimal::Decimal;

/// Key prefix for bank balances.
pub const BANK_PREFIX: u8 = 0x10;

/// The payment collaborator the keeper moves funds through.
pub trait PaymentLedger {
    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    /// Returns [`EscrowError::InsufficientFunds`] if `from` cannot cover
    /// any one denom; nothing moves in that case.
    fn send(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<()>;

    /// Every non-zero balance held by `account`.
    fn balance(&self, store: &dyn KvStore, account: &Address) -> Result<Coins>;
}

/// Store-backed [`PaymentLedger`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Bank;

impl Bank {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn account_prefix(account: &Address) -> Vec<u8> {
        join_key(&[&[BANK_PREFIX], account.as_bytes()])
    }

    fn balance_key(account: &Address, denom: &str) -> Vec<u8> {
        join_key(&[&[BANK_PREFIX], account.as_bytes(), denom.as_bytes()])
    }

    /// Balance of one denom.
    ///
    /// # Errors
    /// Returns [`EscrowError::Serialization`] on a corrupt entry.
    pub fn balance_of(&self, store: &dyn KvStore, account: &Address, denom: &str) -> Result<Decimal> {
        Ok(codec::load(store, &Self::balance_key(account, denom))?.unwrap_or(Decimal::ZERO))
    }

    fn set_balance(store: &mut dyn KvStore, account: &Address, denom: &str, amount: Decimal) -> Result<()> {
        let key = Self::balance_key(account, denom);
        if amount.is_zero() {
            store.delete(&key);
            Ok(())
        } else {
            codec::save(store, &key, &amount)
        }
    }

    fn credit(account: &Address, current: Decimal, coin: &Coin) -> Result<Decimal> {
        current.checked_add(coin.amount).ok_or_else(|| EscrowError::InvalidCoins {
            reason: format!("crediting {coin} to {account} overflows its balance"),
        })
    }

    /// Credit new coins to `account` (genesis funding and tests).
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidCoins`] for an invalid amount or a
    /// balance overflow.
    pub fn mint(&self, store: &mut dyn KvStore, account: &Address, amount: &Coins) -> Result<()> {
        amount.validate()?;
        for coin in amount.iter() {
            let current = self.balance_of(store, account, &coin.denom)?;
            let updated = Self::credit(account, current, coin)?;
            Self::set_balance(store, account, &coin.denom, updated)?;
        }
        tracing::debug!(account = %account, amount = %amount, "Minted coins");
        Ok(())
    }

    /// Sum of every account's balance of `denom`.
    ///
    /// # Errors
    /// Returns [`EscrowError::Serialization`] on a corrupt entry.
    pub fn total_supply(&self, store: &dyn KvStore, denom: &str) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for (key, value) in store.prefix_range(&[BANK_PREFIX]) {
            if key.ends_with(denom.as_bytes()) && key.len() == 1 + ADDRESS_LEN + denom.len() {
                total += codec::decode::<Decimal>(&value)?;
            }
        }
        Ok(total)
    }
}

impl PaymentLedger for Bank {
    fn send(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<()> {
        let mut debits = Vec::with_capacity(amount.len());
        for coin in amount.iter() {
            if coin.amount < Decimal::ZERO {
                return Err(EscrowError::InvalidCoins {
                    reason: format!("cannot send negative amount {coin}"),
                });
            }
            let available = self.balance_of(store, from, &coin.denom)?;
            if available < coin.amount {
                return Err(EscrowError::InsufficientFunds {
                    account: from.to_string(),
                    needed: coin.to_string(),
                    available: Coin::new(coin.denom.clone(), available).to_string(),
                });
            }
            debits.push((coin, available));
        }
        if from == to {
            return Ok(());
        }
        let mut credits = Vec::with_capacity(debits.len());
        for (coin, _) in &debits {
            let current = self.balance_of(store, to, &coin.denom)?;
            credits.push(Self::credit(to, current, coin)?);
        }
        for ((coin, available), credited) in debits.into_iter().zip(credits) {
            Self::set_balance(store, from, &coin.denom, available - coin.amount)?;
            Self::set_balance(store, to, &coin.denom, credited)?;
        }
        tracing::debug!(from = %from, to = %to, amount = %amount, "Moved coins");
        Ok(())
    }

    fn balance(&self, store: &dyn KvStore, account: &Address) -> Result<Coins> {
        let prefix = Self::account_prefix(account);
        let mut coins = Vec::new();
        for (key, value) in store.prefix_range(&prefix) {
            let denom = String::from_utf8(key[prefix.len()..].to_vec()).map_err(|e| {
                EscrowError::CorruptedState {
                    reason: format!("bank key with non-utf8 denom: {e}"),
                }
            })?;
            coins.push(Coin::new(denom, codec::decode(&value)?));
        }
        Ok(Coins::new(coins))
    }
}
