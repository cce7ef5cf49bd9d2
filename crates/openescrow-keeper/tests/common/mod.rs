//! Shared harness: a single-module "chain" driving the keeper block by block.

#![allow(dead_code)]

use openescrow_assets::{Bank, Nft, NftStore, ObjectRegistry, ObjectStore, PaymentLedger};
use openescrow_keeper::{Keeper, index};
use openescrow_store::{KvStore, MemStore};
use openescrow_types::{
    Address, Coins, EscrowId, EscrowMsg, FeeConfig, KeeperConfig, MsgCreateEscrow, MsgRefundEscrow,
    MsgResponse, MsgTransferToEscrow, MsgUpdateEscrow, Result, TransferableObject,
};
use rust_decimal::Decimal;

pub const T0: u64 = 1_700_000_000;
pub const CLASS: &str = "punks";

pub fn atom(n: i64) -> Coins {
    Coins::single("atom", Decimal::new(n, 0))
}

pub fn ufee(n: i64) -> Coins {
    Coins::single("ufee", Decimal::new(n, 0))
}

pub struct Chain {
    pub keeper: Keeper,
    pub store: MemStore,
    pub bank: Bank,
    pub now: u64,
}

impl Chain {
    pub fn new() -> Self {
        Self::with_fees(FeeConfig::free())
    }

    pub fn with_fees(fees: FeeConfig) -> Self {
        let config = KeeperConfig {
            fees,
            ..KeeperConfig::default()
        };
        let stores: Vec<Box<dyn ObjectStore>> = vec![Box::new(NftStore)];
        let registry = ObjectRegistry::new(stores).expect("registry");
        let keeper = Keeper::new(config, registry, Box::new(Bank::new())).expect("keeper");
        let mut chain = Self {
            keeper,
            store: MemStore::new(),
            bank: Bank::new(),
            now: T0,
        };
        chain.advance_to(T0);
        chain
    }

    /// Begin the block at `time`. Returns the number of escrows expired.
    pub fn advance_to(&mut self, time: u64) -> usize {
        let expired = self.keeper.begin_block(&mut self.store, time).expect("begin_block");
        self.now = time;
        self.check();
        expired
    }

    /// Deliver one message in the current block, then audit the state.
    pub fn submit(&mut self, msg: EscrowMsg) -> Result<MsgResponse> {
        let result = self.keeper.deliver_tx(&mut self.store, self.now, &msg);
        self.check();
        result
    }

    pub fn check(&self) {
        let report = self.keeper.check_invariants(&self.store).expect("audit");
        assert!(report.is_ok(), "invariants violated: {:?}", report.violations);
    }

    pub fn fund(&mut self, account: &Address, coins: &Coins) {
        self.bank.mint(&mut self.store, account, coins).expect("mint coins");
    }

    pub fn balance(&self, account: &Address) -> Coins {
        self.bank.balance(&self.store, account).expect("balance")
    }

    pub fn mint_nft(&mut self, token: &str, owner: Address) -> Nft {
        let nft = Nft::new(CLASS, token, owner);
        NftStore.mint(&mut self.store, &nft).expect("mint nft");
        nft
    }

    pub fn nft(&self, token: &str) -> Nft {
        NftStore
            .get(&self.store, CLASS, token)
            .expect("read nft")
            .expect("nft exists")
    }

    pub fn owner(&self, token: &str) -> Address {
        self.nft(token).owner
    }

    /// Mint `token` for `seller` and list it at `price`.
    pub fn list(&mut self, token: &str, seller: Address, price: Coins, deadline: u64) -> EscrowId {
        let nft = self.mint_nft(token, seller);
        self.submit(EscrowMsg::CreateEscrow(create_msg(&nft, price, deadline)))
            .expect("create escrow")
            .escrow_id
            .expect("escrow id")
    }

    /// Remove every escrow record and counter, leaving assets and balances.
    pub fn wipe_escrow_state(&mut self) {
        for prefix in [index::ESCROW_PREFIX, index::DEADLINE_PREFIX] {
            for (key, _) in self.store.prefix_range(&[prefix]) {
                self.store.delete(&key);
            }
        }
        self.store.delete(&index::NEXT_ID_KEY);
        self.store.delete(&index::LAST_BLOCK_TIME_KEY);
    }

    /// Overwrite the stored copy of `nft` without going through its store.
    pub fn overwrite_nft(&mut self, nft: &Nft) {
        let key = openescrow_assets::object_key(nft.type_id(), &nft.primary_key());
        self.store.set(&key, nft.encode().expect("encode"));
    }
}

pub fn create_msg(nft: &Nft, price: Coins, deadline: u64) -> MsgCreateEscrow {
    MsgCreateEscrow {
        seller: nft.owner,
        fee_payer: None,
        object: nft.to_any().expect("snapshot"),
        price,
        deadline,
        is_auction: false,
        broker: None,
        broker_commission: Decimal::ZERO,
    }
}

pub fn buy(id: EscrowId, buyer: Address, amount: Coins) -> EscrowMsg {
    EscrowMsg::TransferToEscrow(MsgTransferToEscrow {
        id,
        buyer,
        fee_payer: None,
        amount,
    })
}

pub fn refund(id: EscrowId, sender: Address) -> EscrowMsg {
    EscrowMsg::RefundEscrow(MsgRefundEscrow {
        id,
        sender,
        fee_payer: None,
    })
}

pub fn update(id: EscrowId, updater: Address) -> MsgUpdateEscrow {
    MsgUpdateEscrow {
        id,
        updater,
        fee_payer: None,
        seller: None,
        price: None,
        deadline: None,
    }
}
