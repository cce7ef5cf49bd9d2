//! The escrow lifecycle engine.
//!
//! Every operation takes the store branch it runs against and the block
//! time it executes in. Operations validate completely before their first
//! write; once value starts moving (custody transfer, payment, swap) any
//! failure is a fault and the caller's transaction must be discarded.

use openescrow_assets::{ObjectRegistry, PaymentLedger};
use openescrow_store::KvStore;
use openescrow_types::{
    Address, Coins, Escrow, EscrowError, EscrowId, EscrowState, KeeperConfig, MsgCreateEscrow,
    MsgUpdateEscrow, Result, TransferContext, TransferableObject,
};

use crate::index;

/// Escrow keeper.
///
/// Holds only configuration and collaborators; all state lives in the
/// store passed to each call.
pub struct Keeper {
    config: KeeperConfig,
    registry: ObjectRegistry,
    ledger: Box<dyn PaymentLedger>,
    custody: Address,
    fee_collector: Address,
}

impl Keeper {
    /// # Errors
    /// Returns [`EscrowError::Configuration`] for an invalid config.
    pub fn new(
        config: KeeperConfig,
        registry: ObjectRegistry,
        ledger: Box<dyn PaymentLedger>,
    ) -> Result<Self> {
        config.validate()?;
        let custody = config.custody_address();
        let fee_collector = config.fee_collector_address();
        tracing::info!(
            custody = %custody,
            fee_collector = %fee_collector,
            object_types = ?registry.type_ids(),
            "Escrow keeper initialized"
        );
        Ok(Self {
            config,
            registry,
            ledger,
            custody,
            fee_collector,
        })
    }

    #[must_use]
    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    #[must_use]
    pub fn ledger(&self) -> &dyn PaymentLedger {
        self.ledger.as_ref()
    }

    /// Account holding escrowed objects and in-flight funds.
    #[must_use]
    pub fn custody_address(&self) -> Address {
        self.custody
    }

    #[must_use]
    pub fn fee_collector_address(&self) -> Address {
        self.fee_collector
    }

    // ---------------------------------------------------------------------
    // CreateEscrow
    // ---------------------------------------------------------------------

    /// Open a new escrow and take the object into custody.
    ///
    /// # Errors
    /// - [`EscrowError::UnknownObjectType`] / [`EscrowError::UnknownObject`]
    ///   if the object is not exactly what its store holds
    /// - any record validation error
    /// - [`EscrowError::CorruptedState`] if the next id is already taken or
    ///   the id counter is exhausted
    pub fn create_escrow(&self, store: &mut dyn KvStore, now: u64, msg: &MsgCreateEscrow) -> Result<EscrowId> {
        let id = index::next_escrow_id(store)?;
        if index::has_escrow(store, id) {
            tracing::error!(escrow = %id, "Next escrow id already in use");
            return Err(EscrowError::CorruptedState {
                reason: format!("escrow {id} already exists at the next-id counter"),
            });
        }
        let next_id = id.next().ok_or_else(|| EscrowError::CorruptedState {
            reason: format!("escrow id counter exhausted at {id}"),
        })?;

        let mut object = self.registry.load_checked(store, &msg.object)?;
        let mut escrow = Escrow {
            id,
            seller: msg.seller,
            object: msg.object.clone(),
            price: msg.price.clone(),
            state: EscrowState::Open,
            deadline: msg.deadline,
            is_auction: msg.is_auction,
            buyer: None,
            broker: msg.broker,
            broker_commission: msg.broker_commission,
        };
        escrow.validate(object.as_ref(), now)?;

        let ctx = TransferContext {
            escrow_id: id,
            block_time: now,
        };
        object.transfer(&escrow.seller, &self.custody, &ctx)?;
        self.registry.write(store, object.as_ref())?;
        escrow.object = object.to_any()?;

        index::save_escrow(store, &escrow)?;
        index::set_next_escrow_id(store, next_id)?;

        tracing::info!(
            escrow = %id,
            seller = %escrow.seller,
            price = %escrow.price,
            deadline = ?escrow.deadline_utc(),
            auction = escrow.is_auction,
            "Escrow created"
        );
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // UpdateEscrow
    // ---------------------------------------------------------------------

    /// Change the seller, price or deadline of an open escrow.
    ///
    /// # Errors
    /// - [`EscrowError::EmptyUpdate`] if nothing would change
    /// - [`EscrowError::Unauthorized`] unless `updater` is the seller
    /// - [`EscrowError::DeadlineShortened`] for an earlier deadline
    /// - not-found / state errors from the open-escrow lookup
    pub fn update_escrow(&self, store: &mut dyn KvStore, now: u64, msg: &MsgUpdateEscrow) -> Result<()> {
        if msg.is_empty() {
            return Err(EscrowError::EmptyUpdate);
        }
        let mut escrow = self.get_open_escrow(store, msg.id, now)?;
        if msg.updater != escrow.seller {
            return Err(EscrowError::Unauthorized {
                reason: format!("only the seller may update escrow {}", escrow.id),
            });
        }

        if let Some(deadline) = msg.deadline {
            if deadline < escrow.deadline {
                tracing::warn!(
                    escrow = %escrow.id,
                    old = escrow.deadline,
                    new = deadline,
                    "Rejected deadline shortening"
                );
                return Err(EscrowError::DeadlineShortened {
                    old: escrow.deadline,
                    new: deadline,
                });
            }
            escrow.deadline = deadline;
        }
        if let Some(seller) = msg.seller {
            escrow.seller = seller;
        }
        if let Some(price) = &msg.price {
            escrow.price = price.clone();
        }
        escrow.validate_without_deadline_and_object()?;
        escrow.validate_deadline(now)?;

        index::save_escrow(store, &escrow)?;
        tracing::info!(
            escrow = %escrow.id,
            seller = %escrow.seller,
            price = %escrow.price,
            deadline = escrow.deadline,
            "Escrow updated"
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // TransferToEscrow
    // ---------------------------------------------------------------------

    /// Buy a fixed-price escrow. Exactly `price` is taken from `buyer`,
    /// however much `amount` exceeds it.
    ///
    /// # Errors
    /// - [`EscrowError::AuctionNotPurchasable`] for an auction
    /// - [`EscrowError::BuyerIsSeller`] if the seller tries to buy
    /// - [`EscrowError::InsufficientPayment`] if `amount` does not cover the price
    /// - [`EscrowError::InsufficientFunds`] if `buyer` cannot pay
    /// - [`EscrowError::SwapFailed`] (fatal) if the swap fails after payment
    pub fn transfer_to_escrow(
        &self,
        store: &mut dyn KvStore,
        now: u64,
        buyer: &Address,
        id: EscrowId,
        amount: &Coins,
    ) -> Result<()> {
        buyer.validate()?;
        amount.validate()?;
        let mut escrow = self.get_open_escrow(store, id, now)?;
        if escrow.is_auction {
            return Err(EscrowError::AuctionNotPurchasable(id));
        }
        if *buyer == escrow.seller {
            return Err(EscrowError::BuyerIsSeller(id));
        }
        if !amount.is_all_gte(&escrow.price) {
            return Err(EscrowError::InsufficientPayment {
                price: escrow.price.to_string(),
                offered: amount.to_string(),
            });
        }

        self.ledger.send(store, buyer, &self.custody, &escrow.price)?;

        let seller = escrow.seller;
        let payouts = [(seller, escrow.price.clone())];
        self.settle(store, now, &mut escrow, buyer, &payouts)
            .map_err(|e| self.swap_failed(id, &e))?;

        tracing::info!(
            escrow = %id,
            buyer = %buyer,
            seller = %seller,
            price = %escrow.price,
            "Escrow purchased"
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // RefundEscrow
    // ---------------------------------------------------------------------

    /// Return the object to the seller and close the escrow.
    ///
    /// The seller may refund an open escrow; anyone may refund an expired
    /// one. A bid recorded on an auction is paid back to its bidder.
    ///
    /// # Errors
    /// - [`EscrowError::EscrowNotFound`]
    /// - [`EscrowError::Unauthorized`] for a non-seller on an open escrow
    /// - [`EscrowError::SwapFailed`] (fatal) if the custody release fails
    pub fn refund_escrow(&self, store: &mut dyn KvStore, now: u64, sender: &Address, id: EscrowId) -> Result<()> {
        let mut escrow = index::get_escrow(store, id)?.ok_or(EscrowError::EscrowNotFound(id))?;
        match escrow.state {
            EscrowState::Open if *sender != escrow.seller => {
                return Err(EscrowError::Unauthorized {
                    reason: format!("only the seller may refund open escrow {id}"),
                });
            }
            EscrowState::Open | EscrowState::Expired => {}
            state => return Err(EscrowError::EscrowNotOpen { id, state }),
        }
        self.refund(store, now, &mut escrow)?;
        tracing::info!(escrow = %id, sender = %sender, seller = %escrow.seller, "Escrow refunded");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // CompleteAuction
    // ---------------------------------------------------------------------

    /// Settle an auction. With a recorded bidder the object goes to the
    /// bidder, the price minus commission to the seller and the commission
    /// to the broker, all out of custody. Without one the object returns to
    /// the seller.
    ///
    /// An auction closes at its deadline, so this works on Open and Expired
    /// records alike.
    ///
    /// # Errors
    /// - [`EscrowError::EscrowNotFound`]
    /// - [`EscrowError::NotAnAuction`]
    /// - [`EscrowError::Unauthorized`] unless `sender` is the seller or broker
    /// - [`EscrowError::SwapFailed`] (fatal) if the swap fails
    pub fn complete_auction(&self, store: &mut dyn KvStore, now: u64, sender: &Address, id: EscrowId) -> Result<()> {
        let mut escrow = self.get_live_escrow(store, id)?;
        if !escrow.is_auction {
            return Err(EscrowError::NotAnAuction(id));
        }
        if *sender != escrow.seller && Some(*sender) != escrow.broker {
            return Err(EscrowError::Unauthorized {
                reason: format!("only the seller or broker may complete auction {id}"),
            });
        }

        let Some(bidder) = escrow.buyer else {
            self.refund(store, now, &mut escrow)?;
            tracing::info!(escrow = %id, seller = %escrow.seller, "Auction closed without bidder");
            return Ok(());
        };

        let commission = match escrow.broker {
            Some(_) => escrow.price.mul_truncate(escrow.broker_commission)?,
            None => Coins::empty(),
        };
        let seller_share = escrow
            .price
            .checked_sub(&commission)
            .ok_or_else(|| EscrowError::Internal(format!("commission {commission} exceeds price of {id}")))?;
        let mut payouts = vec![(escrow.seller, seller_share)];
        if let Some(broker) = escrow.broker {
            payouts.push((broker, commission.clone()));
        }

        self.settle(store, now, &mut escrow, &bidder, &payouts)
            .map_err(|e| self.swap_failed(id, &e))?;

        tracing::info!(
            escrow = %id,
            bidder = %bidder,
            seller = %escrow.seller,
            commission = %commission,
            "Auction completed"
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Shared steps
    // ---------------------------------------------------------------------

    /// Look up an escrow that is Open and whose deadline has not passed.
    pub(crate) fn get_open_escrow(&self, store: &dyn KvStore, id: EscrowId, now: u64) -> Result<Escrow> {
        let escrow = index::get_escrow(store, id)?.ok_or(EscrowError::EscrowNotFound(id))?;
        if escrow.state != EscrowState::Open {
            return Err(EscrowError::EscrowNotOpen {
                id,
                state: escrow.state,
            });
        }
        if escrow.is_past_deadline(now) {
            return Err(EscrowError::EscrowExpired(id));
        }
        Ok(escrow)
    }

    /// Look up an escrow that still holds its object, whatever the deadline.
    fn get_live_escrow(&self, store: &dyn KvStore, id: EscrowId) -> Result<Escrow> {
        let escrow = index::get_escrow(store, id)?.ok_or(EscrowError::EscrowNotFound(id))?;
        if !escrow.state.is_live() {
            return Err(EscrowError::EscrowNotOpen {
                id,
                state: escrow.state,
            });
        }
        Ok(escrow)
    }

    /// Move the escrowed object out of custody to `to`.
    fn release_object(&self, store: &mut dyn KvStore, now: u64, escrow: &Escrow, to: &Address) -> Result<()> {
        let mut object: Box<dyn TransferableObject> = self.registry.load_checked(store, &escrow.object)?;
        let ctx = TransferContext {
            escrow_id: escrow.id,
            block_time: now,
        };
        object.transfer(&self.custody, to, &ctx)?;
        self.registry.write(store, object.as_ref())
    }

    /// Object to `recipient`, each payout out of custody, then close as
    /// Completed.
    fn settle(
        &self,
        store: &mut dyn KvStore,
        now: u64,
        escrow: &mut Escrow,
        recipient: &Address,
        payouts: &[(Address, Coins)],
    ) -> Result<()> {
        self.release_object(store, now, escrow, recipient)?;
        for (to, amount) in payouts {
            if !amount.is_empty() {
                self.ledger.send(store, &self.custody, to, amount)?;
            }
        }
        escrow.transition(EscrowState::Completed)?;
        index::delete_escrow(store, escrow)
    }

    /// Object back to the seller, a recorded bid back to its bidder, then
    /// close as Refunded.
    pub(crate) fn refund(&self, store: &mut dyn KvStore, now: u64, escrow: &mut Escrow) -> Result<()> {
        let seller = escrow.seller;
        let returned = self
            .release_object(store, now, escrow, &seller)
            .and_then(|()| self.return_bid(store, escrow));
        returned.map_err(|e| self.swap_failed(escrow.id, &e))?;
        escrow.transition(EscrowState::Refunded)?;
        index::delete_escrow(store, escrow)
    }

    /// Bid funds held in custody go back to the recorded bidder.
    fn return_bid(&self, store: &mut dyn KvStore, escrow: &Escrow) -> Result<()> {
        match escrow.buyer {
            Some(bidder) if escrow.is_auction => {
                self.ledger.send(store, &self.custody, &bidder, &escrow.price)?;
                tracing::info!(escrow = %escrow.id, bidder = %bidder, amount = %escrow.price, "Bid returned");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn swap_failed(&self, id: EscrowId, cause: &EscrowError) -> EscrowError {
        tracing::error!(escrow = %id, custody = %self.custody, error = %cause, "Swap failed after value moved");
        EscrowError::SwapFailed {
            id,
            reason: cause.to_string(),
        }
    }
}

impl std::fmt::Debug for Keeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keeper")
            .field("custody", &self.custody)
            .field("fee_collector", &self.fee_collector)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
