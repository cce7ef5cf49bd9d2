//! Message entry point: fees first, then the lifecycle operation.

use openescrow_store::{KvStore, run_tx};
use openescrow_types::{EscrowMsg, MsgResponse, Result};

use crate::Keeper;

impl Keeper {
    /// Apply one message against `store`.
    ///
    /// Writes go straight to `store`; on error the caller must discard
    /// them. Use [`Keeper::deliver_tx`] to get that for free.
    ///
    /// # Errors
    /// The stateless check, fee or operation error.
    pub fn deliver(&self, store: &mut dyn KvStore, now: u64, msg: &EscrowMsg) -> Result<MsgResponse> {
        msg.validate_basic()?;
        let fee_paid = self.collect_fees(store, &msg.fee_payer(), msg.kind())?;

        let escrow_id = match msg {
            EscrowMsg::CreateEscrow(m) => Some(self.create_escrow(store, now, m)?),
            EscrowMsg::UpdateEscrow(m) => {
                self.update_escrow(store, now, m)?;
                None
            }
            EscrowMsg::TransferToEscrow(m) => {
                self.transfer_to_escrow(store, now, &m.buyer, m.id, &m.amount)?;
                None
            }
            EscrowMsg::RefundEscrow(m) => {
                self.refund_escrow(store, now, &m.sender, m.id)?;
                None
            }
            EscrowMsg::CompleteAuction(m) => {
                self.complete_auction(store, now, &m.sender, m.id)?;
                None
            }
        };
        Ok(MsgResponse { escrow_id, fee_paid })
    }

    /// [`Keeper::deliver`] inside its own transaction branch: either every
    /// write lands in `store` or none does.
    ///
    /// # Errors
    /// Same as [`Keeper::deliver`].
    pub fn deliver_tx(&self, store: &mut dyn KvStore, now: u64, msg: &EscrowMsg) -> Result<MsgResponse> {
        let result = run_tx(store, |tx| self.deliver(tx, now, msg));
        match &result {
            Err(e) if e.is_fatal() => {
                tracing::error!(op = %msg.kind(), signer = %msg.signer(), error = %e, "Fatal fault, transaction discarded");
            }
            Err(e) => {
                tracing::debug!(op = %msg.kind(), signer = %msg.signer(), error = %e, "Message rejected");
            }
            Ok(_) => {}
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use openescrow_assets::PaymentLedger;
    use openescrow_types::{
        Address, Coins, EscrowError, EscrowId, FeeConfig, MsgTransferToEscrow, MsgUpdateEscrow,
    };
    use rust_decimal::Decimal;

    use super::*;
    use crate::testutil::{Fixture, T0, atom, buyer, seller};

    fn ufee(n: i64) -> Coins {
        Coins::single("ufee", Decimal::new(n, 0))
    }

    fn create(fx: &mut Fixture, token: &str, deadline: u64) -> EscrowMsg {
        let nft = fx.mint_nft(token, seller());
        EscrowMsg::CreateEscrow(fx.create_msg(&nft, atom(50), deadline))
    }

    #[test]
    fn create_charges_fee_and_returns_id() {
        let mut fx = Fixture::with_fees(FeeConfig::default());
        fx.fund(&seller(), &ufee(10));
        let msg = create(&mut fx, "1", T0 + 100);

        let resp = fx.keeper.deliver_tx(&mut fx.store, T0, &msg).unwrap();
        assert_eq!(resp.escrow_id, Some(EscrowId::FIRST));
        assert_eq!(resp.fee_paid, ufee(10));
        let collector = fx.keeper.fee_collector_address();
        assert_eq!(fx.bank.balance(&fx.store, &collector).unwrap(), ufee(10));
        assert!(fx.bank.balance(&fx.store, &seller()).unwrap().is_empty());
    }

    #[test]
    fn failed_operation_refunds_fee() {
        let mut fx = Fixture::with_fees(FeeConfig::default());
        fx.fund(&seller(), &ufee(10));
        let msg = create(&mut fx, "1", T0);
        let before = fx.store.clone();

        let err = fx.keeper.deliver_tx(&mut fx.store, T0, &msg).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidDeadline { .. }));
        assert_eq!(fx.store, before);
    }

    #[test]
    fn unaffordable_fee_rejects_message() {
        let mut fx = Fixture::with_fees(FeeConfig::default());
        let msg = create(&mut fx, "1", T0 + 100);
        let before = fx.store.clone();

        let err = fx.keeper.deliver_tx(&mut fx.store, T0, &msg).unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientFunds { .. }));
        assert_eq!(fx.store, before);
    }

    #[test]
    fn explicit_fee_payer_is_charged() {
        let mut fx = Fixture::with_fees(FeeConfig::default());
        let sponsor = Address::from_seed(7);
        fx.fund(&sponsor, &ufee(10));
        let nft = fx.mint_nft("1", seller());
        let mut create = fx.create_msg(&nft, atom(50), T0 + 100);
        create.fee_payer = Some(sponsor);

        fx.keeper
            .deliver_tx(&mut fx.store, T0, &EscrowMsg::CreateEscrow(create))
            .unwrap();
        assert!(fx.bank.balance(&fx.store, &sponsor).unwrap().is_empty());
    }

    #[test]
    fn empty_update_rejected_before_fee() {
        let mut fx = Fixture::with_fees(FeeConfig::default());
        fx.fund(&seller(), &ufee(100));
        let before = fx.store.clone();
        let msg = EscrowMsg::UpdateEscrow(MsgUpdateEscrow {
            id: EscrowId::FIRST,
            updater: seller(),
            fee_payer: None,
            seller: None,
            price: None,
            deadline: None,
        });
        let err = fx.keeper.deliver_tx(&mut fx.store, T0, &msg).unwrap_err();
        assert!(matches!(err, EscrowError::EmptyUpdate));
        assert_eq!(fx.store, before);
    }

    #[test]
    fn purchase_through_handler() {
        let mut fx = Fixture::new();
        fx.fund(&buyer(), &atom(50));
        let msg = create(&mut fx, "1", T0 + 100);
        let id = fx
            .keeper
            .deliver_tx(&mut fx.store, T0, &msg)
            .unwrap()
            .escrow_id
            .unwrap();

        let buy = EscrowMsg::TransferToEscrow(MsgTransferToEscrow {
            id,
            buyer: buyer(),
            fee_payer: None,
            amount: atom(50),
        });
        let resp = fx.keeper.deliver_tx(&mut fx.store, T0 + 50, &buy).unwrap();
        assert_eq!(resp.escrow_id, None);
        assert!(resp.fee_paid.is_empty());
        assert_eq!(fx.nft("1").owner, buyer());
        assert_eq!(fx.bank.balance(&fx.store, &seller()).unwrap(), atom(50));
    }
}
