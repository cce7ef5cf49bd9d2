//! Shared unit-test fixture.

use openescrow_assets::{Bank, Nft, NftStore, ObjectRegistry, ObjectStore};
use openescrow_store::MemStore;
use openescrow_types::{
    Address, Coins, EscrowId, FeeConfig, KeeperConfig, MsgCreateEscrow, Result, TransferableObject,
};
use rust_decimal::Decimal;

use crate::Keeper;

pub(crate) const T0: u64 = 1_700_000_000;

pub(crate) fn atom(n: i64) -> Coins {
    Coins::single("atom", Decimal::new(n, 0))
}

pub(crate) fn seller() -> Address {
    Address::from_seed(1)
}

pub(crate) fn buyer() -> Address {
    Address::from_seed(2)
}

pub(crate) struct Fixture {
    pub keeper: Keeper,
    pub store: MemStore,
    pub bank: Bank,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_fees(FeeConfig::free())
    }

    pub fn with_fees(fees: FeeConfig) -> Self {
        let config = KeeperConfig {
            fees,
            ..KeeperConfig::default()
        };
        let stores: Vec<Box<dyn ObjectStore>> = vec![Box::new(NftStore)];
        let registry = ObjectRegistry::new(stores).unwrap();
        let keeper = Keeper::new(config, registry, Box::new(Bank::new())).unwrap();
        Self {
            keeper,
            store: MemStore::new(),
            bank: Bank::new(),
        }
    }

    pub fn fund(&mut self, account: &Address, coins: &Coins) {
        self.bank.mint(&mut self.store, account, coins).unwrap();
    }

    pub fn mint_nft(&mut self, token: &str, owner: Address) -> Nft {
        let nft = Nft::new("punks", token, owner);
        NftStore.mint(&mut self.store, &nft).unwrap();
        nft
    }

    pub fn nft(&self, token: &str) -> Nft {
        NftStore.get(&self.store, "punks", token).unwrap().unwrap()
    }

    pub fn create_msg(&self, nft: &Nft, price: Coins, deadline: u64) -> MsgCreateEscrow {
        MsgCreateEscrow {
            seller: nft.owner,
            fee_payer: None,
            object: nft.to_any().unwrap(),
            price,
            deadline,
            is_auction: false,
            broker: None,
            broker_commission: Decimal::ZERO,
        }
    }

    /// Mint a token for the seller and open a fixed-price escrow on it.
    pub fn open(&mut self, token: &str, price: Coins, deadline: u64) -> Result<EscrowId> {
        let nft = self.mint_nft(token, seller());
        let msg = self.create_msg(&nft, price, deadline);
        self.keeper.create_escrow(&mut self.store, T0, &msg)
    }
}
