//! Shared test fixtures: an in-memory marketplace with one listed item,
//! a funded buyer, and a coordinator/resolver pair wired over fakes.

use std::sync::Arc;

use chrono::Utc;

use holdfast_chain::MockChainGateway;
use holdfast_ledger::{LedgerStore, MemoryLedgerStore};
use holdfast_reputation::{MemoryTierLog, ReputationRecorder};
use holdfast_timer::MemoryTimerService;
use holdfast_types::{Item, ItemId, Transaction, WalletAddress};

use crate::config::CoordinatorConfig;
use crate::coordinator::{DepositRequest, EscrowCoordinator};
use crate::notify::MemoryNotifier;
use crate::resolver::DisputeResolver;

pub(crate) struct Harness {
    pub store: Arc<MemoryLedgerStore>,
    pub chain: Arc<MockChainGateway>,
    pub timers: Arc<MemoryTimerService>,
    pub tier_log: Arc<MemoryTierLog>,
    pub notifier: Arc<MemoryNotifier>,
    pub coordinator: EscrowCoordinator,
    pub resolver: DisputeResolver,
    pub seller: WalletAddress,
    pub buyer: WalletAddress,
    pub item: Item,
}

pub(crate) async fn harness() -> Harness {
    let store = Arc::new(MemoryLedgerStore::new());
    let chain = Arc::new(MockChainGateway::new());
    let timers = Arc::new(MemoryTimerService::new());
    let tier_log = Arc::new(MemoryTierLog::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let recorder = Arc::new(ReputationRecorder::new(store.clone(), tier_log.clone()));

    let seller = WalletAddress::new("0xSellerWallet");
    let buyer = WalletAddress::new("0xBuyerWallet");
    store.upsert_user(&seller).await.unwrap();

    let item = Item {
        id: ItemId::new(),
        title: "vintage synth".to_string(),
        price_usd: 100.0,
        escrow_duration_secs: 600,
        seller_wallet: seller.clone(),
        created_at: Utc::now(),
    };
    store.create_item(&item).await.unwrap();

    let coordinator = EscrowCoordinator::new(
        store.clone(),
        chain.clone(),
        timers.clone(),
        recorder.clone(),
        CoordinatorConfig::default(),
    );
    let resolver = DisputeResolver::new(
        store.clone(),
        chain.clone(),
        recorder,
        notifier.clone(),
    );

    Harness {
        store,
        chain,
        timers,
        tier_log,
        notifier,
        coordinator,
        resolver,
        seller,
        buyer,
        item,
    }
}

pub(crate) async fn deposit(h: &Harness, registration: i64) -> Transaction {
    h.chain.fund(registration, 8453, &h.buyer, 1_000_000).await;
    h.coordinator
        .record_deposit(DepositRequest {
            item_id: h.item.id,
            buyer_wallet: h.buyer.clone(),
            escrow_registration: registration,
            chain_id: 8453,
            deposit_tx_hash: format!("0xdeposit{:04x}", registration),
        })
        .await
        .unwrap()
}

pub(crate) async fn fire_timer(h: &Harness, tx: &Transaction) {
    let refreshed = h.store.get_transaction(tx.id).await.unwrap();
    h.timers
        .fire(refreshed.timer_handle.as_deref().unwrap())
        .await;
}

/// Deposit, then dispute as the buyer: the starting point for resolver tests
pub(crate) async fn disputed_deposit(h: &Harness, registration: i64) -> Transaction {
    let tx = deposit(h, registration).await;
    h.coordinator.open_dispute(tx.id, &h.buyer).await.unwrap()
}
