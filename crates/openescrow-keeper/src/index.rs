//! Primary and deadline indexes.
//!
//! ```text
//! 0x01 | id (8, BE)                 → escrow (JSON)
//! 0x02 | deadline (8, BE) | id (8)  → id
//! 0x03                              → next escrow id
//! 0x04                              → last block time
//! ```
//!
//! Big-endian deadlines make a lexicographic scan of `0x02` a scan in
//! deadline order, tie-broken by id. Both indexes are written together by
//! [`save_escrow`] and removed together by [`delete_escrow`].

use openescrow_store::{KvStore, codec, join_key, prefix_end};
use openescrow_types::{Escrow, EscrowError, EscrowId, Result};

pub const ESCROW_PREFIX: u8 = 0x01;
pub const DEADLINE_PREFIX: u8 = 0x02;
pub const NEXT_ID_KEY: [u8; 1] = [0x03];
pub const LAST_BLOCK_TIME_KEY: [u8; 1] = [0x04];

#[must_use]
pub fn escrow_key(id: EscrowId) -> Vec<u8> {
    join_key(&[&[ESCROW_PREFIX], &id.to_bytes()])
}

#[must_use]
pub fn deadline_key(deadline: u64, id: EscrowId) -> Vec<u8> {
    join_key(&[&[DEADLINE_PREFIX], &deadline.to_be_bytes(), &id.to_bytes()])
}

#[must_use]
pub fn has_escrow(store: &dyn KvStore, id: EscrowId) -> bool {
    store.has(&escrow_key(id))
}

/// # Errors
/// Returns [`EscrowError::Serialization`] on a corrupt record.
pub fn get_escrow(store: &dyn KvStore, id: EscrowId) -> Result<Option<Escrow>> {
    codec::load(store, &escrow_key(id))
}

/// Write `escrow` to both indexes, dropping the deadline entry of the
/// previously stored version if the deadline moved.
///
/// # Errors
/// - [`EscrowError::InvariantViolation`] for a terminal record
/// - [`EscrowError::Serialization`] on encoding failure
pub fn save_escrow(store: &mut dyn KvStore, escrow: &Escrow) -> Result<()> {
    if !escrow.state.is_live() {
        return Err(EscrowError::InvariantViolation {
            reason: format!("escrow {} saved in terminal state {}", escrow.id, escrow.state),
        });
    }
    if let Some(previous) = get_escrow(store, escrow.id)? {
        if previous.deadline != escrow.deadline {
            store.delete(&deadline_key(previous.deadline, escrow.id));
            tracing::debug!(
                escrow = %escrow.id,
                old = previous.deadline,
                new = escrow.deadline,
                "Moved deadline index entry"
            );
        }
    }
    codec::save(store, &escrow_key(escrow.id), escrow)?;
    store.set(&deadline_key(escrow.deadline, escrow.id), escrow.id.to_bytes().to_vec());
    Ok(())
}

/// Remove a closed escrow from both indexes.
///
/// # Errors
/// Returns [`EscrowError::InvariantViolation`] if the record is still Open
/// or Expired. That is a bug in the caller, never a user error.
pub fn delete_escrow(store: &mut dyn KvStore, escrow: &Escrow) -> Result<()> {
    if escrow.state.is_live() {
        tracing::error!(escrow = %escrow.id, state = %escrow.state, "Attempt to delete a live escrow");
        return Err(EscrowError::InvariantViolation {
            reason: format!("escrow {} deleted while {}", escrow.id, escrow.state),
        });
    }
    let deadline = get_escrow(store, escrow.id)?.map_or(escrow.deadline, |stored| stored.deadline);
    store.delete(&escrow_key(escrow.id));
    store.delete(&deadline_key(deadline, escrow.id));
    Ok(())
}

/// Every stored escrow, in id order.
///
/// # Errors
/// Returns [`EscrowError::Serialization`] on a corrupt record.
pub fn iterate_escrows(store: &dyn KvStore) -> Result<Vec<Escrow>> {
    store
        .prefix_range(&[ESCROW_PREFIX])
        .into_iter()
        .map(|(_, value)| codec::decode(&value))
        .collect()
}

/// Ids of every escrow whose deadline is `<= date`, in deadline order.
///
/// # Errors
/// Returns [`EscrowError::CorruptedState`] for a malformed index entry.
pub fn escrows_due(store: &dyn KvStore, date: u64) -> Result<Vec<EscrowId>> {
    let start = [DEADLINE_PREFIX];
    let end = match date.checked_add(1) {
        Some(bound) => Some(join_key(&[&[DEADLINE_PREFIX], &bound.to_be_bytes()])),
        None => prefix_end(&start),
    };
    store
        .range(&start, end.as_deref())
        .into_iter()
        .map(|(key, value)| {
            EscrowId::from_bytes(&value).map_err(|e| EscrowError::CorruptedState {
                reason: format!("deadline index entry {key:?}: {e}"),
            })
        })
        .collect()
}

/// Every `(deadline, id)` pair in the deadline index.
///
/// # Errors
/// Returns [`EscrowError::CorruptedState`] for a malformed entry.
pub fn deadline_entries(store: &dyn KvStore) -> Result<Vec<(u64, EscrowId)>> {
    let mut entries = Vec::new();
    for (key, value) in store.prefix_range(&[DEADLINE_PREFIX]) {
        let corrupt = || EscrowError::CorruptedState {
            reason: format!("malformed deadline index key {key:?}"),
        };
        let deadline_bytes: [u8; 8] = key.get(1..9).ok_or_else(corrupt)?.try_into().map_err(|_| corrupt())?;
        let id = EscrowId::from_bytes(key.get(9..).ok_or_else(corrupt)?)?;
        if value != id.to_bytes() {
            return Err(corrupt());
        }
        entries.push((u64::from_be_bytes(deadline_bytes), id));
    }
    Ok(entries)
}

/// # Errors
/// Returns [`EscrowError::Serialization`] on a corrupt counter.
pub fn next_escrow_id(store: &dyn KvStore) -> Result<EscrowId> {
    Ok(codec::load(store, &NEXT_ID_KEY)?.unwrap_or(EscrowId::FIRST))
}

/// # Errors
/// Returns [`EscrowError::Serialization`] on encoding failure.
pub fn set_next_escrow_id(store: &mut dyn KvStore, id: EscrowId) -> Result<()> {
    codec::save(store, &NEXT_ID_KEY, &id)
}

/// Block time of the last sweep (0 before the first block).
///
/// # Errors
/// Returns [`EscrowError::Serialization`] on a corrupt entry.
pub fn last_block_time(store: &dyn KvStore) -> Result<u64> {
    Ok(codec::load(store, &LAST_BLOCK_TIME_KEY)?.unwrap_or(0))
}

/// # Errors
/// Returns [`EscrowError::Serialization`] on encoding failure.
pub fn set_last_block_time(store: &mut dyn KvStore, time: u64) -> Result<()> {
    codec::save(store, &LAST_BLOCK_TIME_KEY, &time)
}

#[cfg(test)]
mod tests {
    use openescrow_store::MemStore;
    use openescrow_types::{Address, AnyObject, Coins, EscrowState, ObjectTypeId};
    use rust_decimal::Decimal;

    use super::*;

    fn escrow(id: u64, deadline: u64) -> Escrow {
        Escrow::dummy(
            EscrowId(id),
            Address::from_seed(1),
            AnyObject::new(ObjectTypeId(1), vec![1]),
            Coins::single("atom", Decimal::new(10, 0)),
            deadline,
        )
    }

    #[test]
    fn save_writes_both_indexes() {
        let mut store = MemStore::new();
        let e = escrow(1, 100);
        save_escrow(&mut store, &e).unwrap();
        assert!(has_escrow(&store, EscrowId(1)));
        assert_eq!(get_escrow(&store, EscrowId(1)).unwrap(), Some(e));
        assert_eq!(deadline_entries(&store).unwrap(), vec![(100, EscrowId(1))]);
    }

    #[test]
    fn moving_deadline_drops_stale_entry() {
        let mut store = MemStore::new();
        let mut e = escrow(1, 100);
        save_escrow(&mut store, &e).unwrap();
        e.deadline = 300;
        save_escrow(&mut store, &e).unwrap();
        assert_eq!(deadline_entries(&store).unwrap(), vec![(300, EscrowId(1))]);
        assert!(escrows_due(&store, 200).unwrap().is_empty());
    }

    #[test]
    fn due_scan_is_inclusive_and_ordered() {
        let mut store = MemStore::new();
        for (id, deadline) in [(1, 300), (2, 100), (3, 200), (4, 100)] {
            save_escrow(&mut store, &escrow(id, deadline)).unwrap();
        }
        assert_eq!(
            escrows_due(&store, 200).unwrap(),
            vec![EscrowId(2), EscrowId(4), EscrowId(3)]
        );
        assert!(escrows_due(&store, 99).unwrap().is_empty());
        assert_eq!(escrows_due(&store, u64::MAX).unwrap().len(), 4);
    }

    #[test]
    fn live_escrow_cannot_be_deleted() {
        let mut store = MemStore::new();
        let e = escrow(1, 100);
        save_escrow(&mut store, &e).unwrap();
        let err = delete_escrow(&mut store, &e).unwrap_err();
        assert!(err.is_fatal());
        assert!(has_escrow(&store, EscrowId(1)));
    }

    #[test]
    fn closed_escrow_is_deleted_from_both_indexes() {
        let mut store = MemStore::new();
        let mut e = escrow(1, 100);
        save_escrow(&mut store, &e).unwrap();
        e.state = EscrowState::Refunded;
        delete_escrow(&mut store, &e).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn terminal_escrow_cannot_be_saved() {
        let mut store = MemStore::new();
        let mut e = escrow(1, 100);
        e.state = EscrowState::Completed;
        assert!(save_escrow(&mut store, &e).unwrap_err().is_fatal());
    }

    #[test]
    fn counters_default_and_persist() {
        let mut store = MemStore::new();
        assert_eq!(next_escrow_id(&store).unwrap(), EscrowId::FIRST);
        assert_eq!(last_block_time(&store).unwrap(), 0);
        set_next_escrow_id(&mut store, EscrowId(9)).unwrap();
        set_last_block_time(&mut store, 1_234).unwrap();
        assert_eq!(next_escrow_id(&store).unwrap(), EscrowId(9));
        assert_eq!(last_block_time(&store).unwrap(), 1_234);
    }

    #[test]
    fn iterate_in_id_order() {
        let mut store = MemStore::new();
        for id in [3, 1, 2] {
            save_escrow(&mut store, &escrow(id, 100)).unwrap();
        }
        let ids: Vec<EscrowId> = iterate_escrows(&store).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EscrowId(1), EscrowId(2), EscrowId(3)]);
    }
}
