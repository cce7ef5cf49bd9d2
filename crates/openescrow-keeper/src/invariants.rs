//! Full-state consistency audit.
//!
//! Checked against the store, read-only:
//! ```text
//! custody:     ∀ stored e: registry copy of e.object == e.object ∧ owner == custody
//! closed:      ∀ stored e: e.state ∈ {Open, Expired}
//! expiry:      ∀ stored e: (e.state == Expired) ⇔ (last_block_time ≥ e.deadline)
//! index:       deadline index ↔ primary index is a bijection on (deadline, id)
//! counter:     ∀ stored e: e.id < next_escrow_id
//! solvency:    custody balance ≥ Σ price of auctions with a recorded bidder
//! ```
//!
//! Any violation means the engine itself is broken. Callers typically run
//! this out of band and halt on a non-empty report.

use std::collections::BTreeSet;

use openescrow_store::KvStore;
use openescrow_types::{Coins, Escrow, EscrowError, EscrowId, EscrowState, Result};

use crate::{Keeper, index};

/// Every violation found by one audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvariantReport {
    pub violations: Vec<String>,
    /// Number of escrow records audited.
    pub escrows_checked: usize,
}

impl InvariantReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    fn fail(&mut self, msg: String) {
        self.violations.push(msg);
    }
}

impl Keeper {
    /// Audit the whole escrow state.
    ///
    /// # Errors
    /// Returns an error only if the store cannot be read at all (corrupt
    /// counters or records); inconsistencies go into the report.
    pub fn check_invariants(&self, store: &dyn KvStore) -> Result<InvariantReport> {
        let mut report = InvariantReport::default();
        let next_id = index::next_escrow_id(store)?;
        let last_block_time = index::last_block_time(store)?;
        let escrows = index::iterate_escrows(store)?;
        report.escrows_checked = escrows.len();

        let mut expected_index = BTreeSet::new();
        let mut committed_bids = Coins::empty();
        for escrow in &escrows {
            let id = escrow.id;
            expected_index.insert((escrow.deadline, id));

            if !escrow.state.is_live() {
                report.fail(format!("escrow {id} stored in terminal state {}", escrow.state));
            }
            if id >= next_id {
                report.fail(format!("escrow {id} not below next id {next_id}"));
            }
            let past = escrow.is_past_deadline(last_block_time);
            if past != (escrow.state == EscrowState::Expired) {
                report.fail(format!(
                    "escrow {id} is {} with deadline {} at last block time {last_block_time}",
                    escrow.state, escrow.deadline
                ));
            }
            if let Err(e) = escrow.validate_without_deadline_and_object() {
                report.fail(format!("escrow {id} malformed: {e}"));
            }
            self.check_custody(store, escrow, &mut report);
            if escrow.is_auction && escrow.buyer.is_some() {
                committed_bids = committed_bids.add(&escrow.price);
            }
        }

        let actual_index: BTreeSet<(u64, EscrowId)> = index::deadline_entries(store)?.into_iter().collect();
        for missing in expected_index.difference(&actual_index) {
            report.fail(format!("escrow {} has no deadline entry at {}", missing.1, missing.0));
        }
        for stale in actual_index.difference(&expected_index) {
            report.fail(format!("stale deadline entry for escrow {} at {}", stale.1, stale.0));
        }

        let custody_funds = self.ledger().balance(store, &self.custody_address())?;
        if !custody_funds.is_all_gte(&committed_bids) {
            report.fail(format!(
                "custody holds {custody_funds}, auctions with bidders need {committed_bids}"
            ));
        }

        if !report.is_ok() {
            tracing::error!(violations = report.violations.len(), "Escrow invariants violated");
        }
        Ok(report)
    }

    fn check_custody(&self, store: &dyn KvStore, escrow: &Escrow, report: &mut InvariantReport) {
        let id = escrow.id;
        match self.registry().load_checked(store, &escrow.object) {
            Ok(object) => match object.is_owned_by(&self.custody_address()) {
                Ok(true) => {}
                Ok(false) => report.fail(format!("escrow {id} object not owned by custody")),
                Err(e) => report.fail(format!("escrow {id} ownership check failed: {e}")),
            },
            Err(e) => report.fail(format!("escrow {id} object out of sync with its store: {e}")),
        }
    }

    /// [`Keeper::check_invariants`], with any violation turned into an error.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvariantViolation`] listing every violation.
    pub fn assert_invariants(&self, store: &dyn KvStore) -> Result<()> {
        let report = self.check_invariants(store)?;
        if report.is_ok() {
            return Ok(());
        }
        Err(EscrowError::InvariantViolation {
            reason: report.violations.join("; "),
        })
    }
}
