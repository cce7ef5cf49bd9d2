//! Per-block expiry sweep.

use openescrow_store::KvStore;
use openescrow_types::{EscrowError, EscrowState, Result};

use crate::{Keeper, index};

impl Keeper {
    /// Start a block: record its time, then expire what is due.
    ///
    /// Returns the number of escrows newly marked Expired.
    ///
    /// # Errors
    /// Returns [`EscrowError::Internal`] if `now` precedes the last block.
    pub fn begin_block(&self, store: &mut dyn KvStore, now: u64) -> Result<usize> {
        let last = index::last_block_time(store)?;
        if now < last {
            tracing::error!(now, last, "Block time went backwards");
            return Err(EscrowError::Internal(format!(
                "block time {now} precedes last block time {last}"
            )));
        }
        index::set_last_block_time(store, now)?;
        self.mark_expired_escrows(store, now)
    }

    /// Mark every Open escrow with `deadline <= now` as Expired.
    ///
    /// Custody is untouched: an expired escrow keeps its object until it is
    /// refunded. Running twice with the same `now` changes nothing the
    /// second time.
    ///
    /// # Errors
    /// Returns [`EscrowError::CorruptedState`] if the deadline index points
    /// at a missing record.
    pub fn mark_expired_escrows(&self, store: &mut dyn KvStore, now: u64) -> Result<usize> {
        let mut expired = 0;
        for id in index::escrows_due(store, now)? {
            let mut escrow = index::get_escrow(store, id)?.ok_or_else(|| EscrowError::CorruptedState {
                reason: format!("deadline index references missing escrow {id}"),
            })?;
            if escrow.state != EscrowState::Open {
                continue;
            }
            escrow.transition(EscrowState::Expired)?;
            index::save_escrow(store, &escrow)?;
            expired += 1;
            tracing::info!(escrow = %id, deadline = escrow.deadline, now, "Escrow expired");
        }
        if expired > 0 {
            tracing::debug!(expired, now, "Expiry sweep finished");
        }
        Ok(expired)
    }

    /// Refund every Expired escrow. Returns how many were refunded.
    ///
    /// Works from a snapshot of the records, so deleting them while
    /// iterating is safe.
    ///
    /// # Errors
    /// Propagates the first refund failure.
    pub fn refund_expired_escrows(&self, store: &mut dyn KvStore, now: u64) -> Result<usize> {
        let mut refunded = 0;
        for mut escrow in index::iterate_escrows(store)? {
            if escrow.state != EscrowState::Expired {
                continue;
            }
            self.refund(store, now, &mut escrow)?;
            refunded += 1;
            tracing::info!(escrow = %escrow.id, seller = %escrow.seller, "Expired escrow refunded");
        }
        Ok(refunded)
    }
}
