//! Snapshot of the keeper's state, used for export and import.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Escrow, EscrowError, EscrowId, EscrowState, Result};

/// Every live escrow plus the counters needed to resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub escrows: Vec<Escrow>,
    /// Block time of the last processed sweep.
    pub last_block_time: u64,
    /// The id the next created escrow will receive.
    pub next_escrow_id: EscrowId,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            escrows: Vec::new(),
            last_block_time: 0,
            next_escrow_id: EscrowId::FIRST,
        }
    }
}

impl GenesisState {
    /// Stateless consistency checks. Object custody is audited separately
    /// once the escrows have been written.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidGenesis`] (or the record's own
    /// validation error) for the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        if self.next_escrow_id < EscrowId::FIRST {
            return Err(EscrowError::InvalidGenesis {
                reason: format!("next escrow id {} below first id", self.next_escrow_id),
            });
        }
        let mut seen = HashSet::with_capacity(self.escrows.len());
        for escrow in &self.escrows {
            if !seen.insert(escrow.id) {
                return Err(EscrowError::InvalidGenesis {
                    reason: format!("duplicate escrow id {}", escrow.id),
                });
            }
            if escrow.id >= self.next_escrow_id {
                return Err(EscrowError::InvalidGenesis {
                    reason: format!(
                        "escrow id {} not below next id {}",
                        escrow.id, self.next_escrow_id
                    ),
                });
            }
            if !escrow.state.is_live() {
                return Err(EscrowError::InvalidState(escrow.state));
            }
            let past = escrow.is_past_deadline(self.last_block_time);
            if past != (escrow.state == EscrowState::Expired) {
                return Err(EscrowError::InvalidGenesis {
                    reason: format!(
                        "escrow {} is {} but deadline {} vs last block time {}",
                        escrow.id, escrow.state, escrow.deadline, self.last_block_time
                    ),
                });
            }
            escrow.validate_without_deadline_and_object()?;
        }
        Ok(())
    }
}
