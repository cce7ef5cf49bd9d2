//! Snapshot export and import.

use openescrow_store::KvStore;
use openescrow_types::{EscrowError, GenesisState, Result};

use crate::{Keeper, index};

impl Keeper {
    /// Dump every live escrow plus both counters.
    ///
    /// # Errors
    /// Returns [`EscrowError::Serialization`] on a corrupt record.
    pub fn export_genesis(&self, store: &dyn KvStore) -> Result<GenesisState> {
        Ok(GenesisState {
            escrows: index::iterate_escrows(store)?,
            last_block_time: index::last_block_time(store)?,
            next_escrow_id: index::next_escrow_id(store)?,
        })
    }

    /// Load a snapshot into an empty escrow state.
    ///
    /// The escrowed objects must already be in their stores, owned by the
    /// custody account, and the bids of auctions with a recorded bidder
    /// must already be funded in custody. On error the caller must discard
    /// the writes.
    ///
    /// # Errors
    /// - [`EscrowError::InvalidGenesis`] if the state is inconsistent, the
    ///   store already holds escrows, an object is not in custody or the
    ///   imported state fails the invariant audit
    /// - [`EscrowError::UnknownObjectType`] for an unregistered object type
    pub fn import_genesis(&self, store: &mut dyn KvStore, genesis: &GenesisState) -> Result<()> {
        genesis.validate()?;
        if !index::iterate_escrows(store)?.is_empty() {
            return Err(EscrowError::InvalidGenesis {
                reason: "escrow state is not empty".into(),
            });
        }

        for escrow in &genesis.escrows {
            let object = self
                .registry()
                .load_checked(store, &escrow.object)
                .map_err(|e| EscrowError::InvalidGenesis {
                    reason: format!("escrow {}: {e}", escrow.id),
                })?;
            if !object.is_owned_by(&self.custody_address())? {
                return Err(EscrowError::InvalidGenesis {
                    reason: format!("escrow {} object is not held in custody", escrow.id),
                });
            }
            index::save_escrow(store, escrow)?;
        }
        index::set_next_escrow_id(store, genesis.next_escrow_id)?;
        index::set_last_block_time(store, genesis.last_block_time)?;

        let report = self.check_invariants(store)?;
        if !report.is_ok() {
            return Err(EscrowError::InvalidGenesis {
                reason: report.violations.join("; "),
            });
        }

        tracing::info!(
            escrows = genesis.escrows.len(),
            next_id = %genesis.next_escrow_id,
            last_block_time = genesis.last_block_time,
            "Imported escrow genesis"
        );
        Ok(())
    }
}
