//! End-to-end escrow lifecycle: listing, purchase, expiry, refund, update
//! and auctions, driven block by block through `deliver_tx`.
//!
//! Every message is followed by a full invariant audit.

mod common;

use common::{Chain, T0, atom, buy, create_msg, refund, update};
use openescrow_keeper::EscrowQuery;
use openescrow_types::{
    Address, EscrowError, EscrowMsg, EscrowState, MsgCompleteAuction,
};
use rust_decimal::Decimal;

#[test]
fn fixed_price_purchase_swaps_asset_and_payment() {
    let mut chain = Chain::new();
    let seller = Address::from_seed(1);
    let buyer = Address::from_seed(2);
    chain.fund(&buyer, &atom(50));

    let id = chain.list("1", seller, atom(50), T0 + 100);
    assert_eq!(chain.owner("1"), chain.keeper.custody_address());

    chain.advance_to(T0 + 50);
    chain.submit(buy(id, buyer, atom(50))).unwrap();

    assert_eq!(chain.owner("1"), buyer);
    assert_eq!(chain.balance(&seller), atom(50));
    assert!(chain.balance(&buyer).is_empty());
    assert!(matches!(
        chain.keeper.get_escrow(&chain.store, id),
        Err(EscrowError::EscrowNotFound(_))
    ));
    assert_eq!(chain.nft("1").last_escrow, Some(id));
}

#[test]
fn expired_escrow_is_refunded_by_anyone() {
    let mut chain = Chain::new();
    let seller = Address::from_seed(1);
    let buyer = Address::from_seed(2);
    chain.fund(&buyer, &atom(50));
    let id = chain.list("1", seller, atom(50), T0 + 10);

    assert_eq!(chain.advance_to(T0 + 20), 1);
    let escrow = chain.keeper.get_escrow(&chain.store, id).unwrap();
    assert_eq!(escrow.state, EscrowState::Expired);
    assert_eq!(chain.owner("1"), chain.keeper.custody_address());

    let err = chain.submit(buy(id, buyer, atom(50))).unwrap_err();
    assert!(matches!(err, EscrowError::EscrowNotOpen { state: EscrowState::Expired, .. }));

    chain.submit(refund(id, Address::random())).unwrap();
    assert_eq!(chain.owner("1"), seller);
    assert_eq!(chain.balance(&buyer), atom(50));
}

#[test]
fn purchase_at_deadline_is_too_late() {
    let mut chain = Chain::new();
    let buyer = Address::from_seed(2);
    chain.fund(&buyer, &atom(50));
    let id = chain.list("1", Address::from_seed(1), atom(50), T0 + 10);

    // Same block as the deadline, before any sweep has run.
    chain.now = T0 + 10;
    let err = chain.submit(buy(id, buyer, atom(50))).unwrap_err();
    assert!(matches!(err, EscrowError::EscrowExpired(_)));
}

#[test]
fn seller_cancels_open_listing() {
    let mut chain = Chain::new();
    let seller = Address::from_seed(1);
    let id = chain.list("1", seller, atom(50), T0 + 100);

    let err = chain.submit(refund(id, Address::from_seed(2))).unwrap_err();
    assert!(matches!(err, EscrowError::Unauthorized { .. }));

    chain.submit(refund(id, seller)).unwrap();
    assert_eq!(chain.owner("1"), seller);
    let err = chain.submit(refund(id, seller)).unwrap_err();
    assert!(matches!(err, EscrowError::EscrowNotFound(_)));
}

#[test]
fn empty_update_is_rejected() {
    let mut chain = Chain::new();
    let seller = Address::from_seed(1);
    let id = chain.list("1", seller, atom(50), T0 + 100);
    let err = chain
        .submit(EscrowMsg::UpdateEscrow(update(id, seller)))
        .unwrap_err();
    assert!(matches!(err, EscrowError::EmptyUpdate));
}

#[test]
fn extended_deadline_moves_expiry() {
    let mut chain = Chain::new();
    let seller = Address::from_seed(1);
    let id = chain.list("1", seller, atom(50), T0 + 10);

    chain.advance_to(T0 + 5);
    let mut extend = update(id, seller);
    extend.deadline = Some(T0 + 30);
    chain.submit(EscrowMsg::UpdateEscrow(extend)).unwrap();

    let mut shorten = update(id, seller);
    shorten.deadline = Some(T0 + 20);
    let err = chain.submit(EscrowMsg::UpdateEscrow(shorten)).unwrap_err();
    assert!(matches!(err, EscrowError::DeadlineShortened { .. }));

    assert_eq!(chain.advance_to(T0 + 20), 0);
    assert_eq!(chain.advance_to(T0 + 30), 1);
}

#[test]
fn price_change_applies_to_next_purchase() {
    let mut chain = Chain::new();
    let seller = Address::from_seed(1);
    let buyer = Address::from_seed(2);
    chain.fund(&buyer, &atom(100));
    let id = chain.list("1", seller, atom(50), T0 + 100);

    let mut reprice = update(id, seller);
    reprice.price = Some(atom(80));
    chain.submit(EscrowMsg::UpdateEscrow(reprice)).unwrap();

    let err = chain.submit(buy(id, buyer, atom(50))).unwrap_err();
    assert!(matches!(err, EscrowError::InsufficientPayment { .. }));
    chain.submit(buy(id, buyer, atom(100))).unwrap();
    assert_eq!(chain.balance(&seller), atom(80));
    assert_eq!(chain.balance(&buyer), atom(20));
}

#[test]
fn only_the_price_is_taken() {
    let mut chain = Chain::new();
    let seller = Address::from_seed(1);
    let buyer = Address::from_seed(2);
    chain.fund(&buyer, &atom(500));
    let id = chain.list("1", seller, atom(50), T0 + 100);

    chain.submit(buy(id, buyer, atom(500))).unwrap();
    assert_eq!(chain.balance(&buyer), atom(450));
    assert_eq!(chain.balance(&seller), atom(50));
}

#[test]
fn auction_without_bidder_returns_asset() {
    let mut chain = Chain::new();
    let seller = Address::from_seed(1);
    let broker = Address::from_seed(3);
    let nft = chain.mint_nft("1", seller);
    let mut msg = create_msg(&nft, atom(100), T0 + 100);
    msg.is_auction = true;
    msg.broker = Some(broker);
    msg.broker_commission = Decimal::new(5, 2);
    let id = chain
        .submit(EscrowMsg::CreateEscrow(msg))
        .unwrap()
        .escrow_id
        .unwrap();

    let err = chain.submit(buy(id, Address::from_seed(2), atom(100))).unwrap_err();
    assert!(matches!(err, EscrowError::AuctionNotPurchasable(_)));

    chain
        .submit(EscrowMsg::CompleteAuction(MsgCompleteAuction {
            id,
            sender: broker,
            fee_payer: None,
        }))
        .unwrap();
    assert_eq!(chain.owner("1"), seller);
    assert!(chain.balance(&broker).is_empty());
}

#[test]
fn listings_are_queryable() {
    let mut chain = Chain::new();
    let alice = Address::from_seed(1);
    let bob = Address::from_seed(4);
    chain.list("a1", alice, atom(10), T0 + 10);
    chain.list("a2", alice, atom(20), T0 + 100);
    chain.list("b1", bob, atom(30), T0 + 100);
    chain.advance_to(T0 + 10);

    let page = chain
        .keeper
        .query_escrows(&chain.store, &EscrowQuery::by_seller(alice))
        .unwrap();
    assert_eq!(page.total, 2);

    let expired = EscrowQuery {
        state: Some(EscrowState::Expired),
        ..EscrowQuery::default()
    };
    let page = chain.keeper.query_escrows(&chain.store, &expired).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.escrows[0].price, atom(10));
}
