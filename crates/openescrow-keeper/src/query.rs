//! Read-only queries.

use openescrow_store::KvStore;
use openescrow_types::{Address, Escrow, EscrowError, EscrowId, EscrowState, Result};
use serde::{Deserialize, Serialize};

use crate::{Keeper, index};

/// Filters combine with AND. `limit = 0` selects the configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowQuery {
    #[serde(default)]
    pub seller: Option<Address>,
    #[serde(default)]
    pub state: Option<EscrowState>,
    /// Primary key of the escrowed object within its store.
    #[serde(default)]
    pub object_key: Option<Vec<u8>>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
}

impl EscrowQuery {
    #[must_use]
    pub fn by_seller(seller: Address) -> Self {
        Self {
            seller: Some(seller),
            ..Self::default()
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowPage {
    pub escrows: Vec<Escrow>,
    /// Number of matches before pagination.
    pub total: usize,
}

impl Keeper {
    /// # Errors
    /// Returns [`EscrowError::EscrowNotFound`] if no such escrow is stored.
    pub fn get_escrow(&self, store: &dyn KvStore, id: EscrowId) -> Result<Escrow> {
        index::get_escrow(store, id)?.ok_or(EscrowError::EscrowNotFound(id))
    }

    /// Filtered, paginated scan in id order.
    ///
    /// # Errors
    /// - [`EscrowError::InvalidQuery`] if `limit` exceeds the configured maximum
    /// - [`EscrowError::UnknownObjectType`] when filtering by object key over
    ///   a record of an unregistered type
    pub fn query_escrows(&self, store: &dyn KvStore, query: &EscrowQuery) -> Result<EscrowPage> {
        let max = self.config().max_query_limit;
        if query.limit > max {
            return Err(EscrowError::InvalidQuery {
                reason: format!("limit {} exceeds maximum {max}", query.limit),
            });
        }
        let limit = if query.limit == 0 {
            self.config().default_query_limit
        } else {
            query.limit
        };

        let mut matches = Vec::new();
        for escrow in index::iterate_escrows(store)? {
            if self.matches(&escrow, query)? {
                matches.push(escrow);
            }
        }
        let total = matches.len();
        let escrows = matches.into_iter().skip(query.offset).take(limit).collect();
        Ok(EscrowPage { escrows, total })
    }

    fn matches(&self, escrow: &Escrow, query: &EscrowQuery) -> Result<bool> {
        if query.seller.is_some_and(|s| s != escrow.seller) {
            return Ok(false);
        }
        if query.state.is_some_and(|s| s != escrow.state) {
            return Ok(false);
        }
        if let Some(key) = &query.object_key {
            let object = self
                .registry()
                .get(escrow.object.type_id)?
                .decode(&escrow.object.value)?;
            if object.primary_key() != *key {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
