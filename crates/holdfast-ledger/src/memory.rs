//! In-memory ledger store
//!
//! Used by tests and local tooling. Claims take the transactions write lock
//! for the compare-and-swap, giving the same one-winner semantics as the
//! Postgres conditional update. Every status write is also appended to a
//! per-transaction history so tests can assert that no state was skipped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use holdfast_types::{
    EscrowStatus, HoldfastError, Item, ItemId, ReputationEvent, ReputationEventId, Result,
    Transaction, TransactionId, User, WalletAddress,
};

use crate::store::{LedgerStore, NewTransaction};

/// In-memory [`LedgerStore`]
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    items: Arc<RwLock<HashMap<ItemId, Item>>>,
    users: Arc<RwLock<HashMap<WalletAddress, User>>>,
    transactions: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
    events: Arc<RwLock<Vec<ReputationEvent>>>,
    history: Arc<RwLock<HashMap<TransactionId, Vec<EscrowStatus>>>>,
    fail_next_resolution: Arc<AtomicBool>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status this transaction has held, in write order
    pub async fn status_history(&self, id: TransactionId) -> Vec<EscrowStatus> {
        self.history
            .read()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the next `record_resolution` call fail with a ledger error,
    /// simulating a terminal write that dies after the chain call succeeded.
    pub fn fail_next_resolution(&self) {
        self.fail_next_resolution.store(true, Ordering::SeqCst);
    }

    async fn push_history(&self, id: TransactionId, status: EscrowStatus) {
        self.history.write().await.entry(id).or_default().push(status);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn create_item(&self, item: &Item) -> Result<()> {
        self.items.write().await.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Item> {
        self.items
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(HoldfastError::ItemNotFound { item_id: id })
    }

    async fn upsert_user(&self, wallet: &WalletAddress) -> Result<User> {
        let mut users = self.users.write().await;
        let user = users.entry(wallet.clone()).or_insert_with(|| User {
            wallet: wallet.clone(),
            display_name: None,
            reputation: 0,
            created_at: Utc::now(),
        });
        Ok(user.clone())
    }

    async fn get_user(&self, wallet: &WalletAddress) -> Result<User> {
        self.users
            .read()
            .await
            .get(wallet)
            .cloned()
            .ok_or_else(|| HoldfastError::UserNotFound {
                wallet: wallet.to_string(),
            })
    }

    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        let tx = Transaction {
            id: TransactionId::new(),
            item_id: new.item_id,
            buyer_wallet: new.buyer_wallet,
            escrow_registration: new.escrow_registration,
            chain_id: new.chain_id,
            deposit_tx_hash: new.deposit_tx_hash,
            escrow_status: new.escrow_status,
            timer_handle: None,
            release_at: None,
            resolved_to: None,
            resolved_at: None,
            disputed_by: None,
            disputed_at: None,
            amount_usd: new.amount_usd,
            created_at: Utc::now(),
            paid_at: new.paid_at,
        };
        self.transactions.write().await.insert(tx.id, tx.clone());
        self.push_history(tx.id, tx.escrow_status).await;
        Ok(tx)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.transactions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(HoldfastError::TransactionNotFound { transaction_id: id })
    }

    async fn list_active(&self) -> Result<Vec<Transaction>> {
        let mut active: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.escrow_status == EscrowStatus::Active)
            .cloned()
            .collect();
        active.sort_by_key(|t| t.created_at);
        Ok(active)
    }

    async fn set_timer(
        &self,
        id: TransactionId,
        handle: &str,
        release_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let mut txs = self.transactions.write().await;
        let tx = txs
            .get_mut(&id)
            .ok_or(HoldfastError::TransactionNotFound { transaction_id: id })?;
        tx.timer_handle = Some(handle.to_string());
        tx.release_at = Some(release_at);
        Ok(tx.clone())
    }

    async fn claim(
        &self,
        id: TransactionId,
        from: EscrowStatus,
        to: EscrowStatus,
    ) -> Result<Transaction> {
        let updated = {
            let mut txs = self.transactions.write().await;
            let tx = txs
                .get_mut(&id)
                .ok_or(HoldfastError::TransactionNotFound { transaction_id: id })?;
            if tx.escrow_status != from {
                return Err(HoldfastError::ClaimLost {
                    transaction_id: id,
                    expected: from,
                });
            }
            tx.escrow_status = to;
            tx.clone()
        };
        self.push_history(id, to).await;
        Ok(updated)
    }

    async fn claim_dispute(
        &self,
        id: TransactionId,
        by: &WalletAddress,
        at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let updated = {
            let mut txs = self.transactions.write().await;
            let tx = txs
                .get_mut(&id)
                .ok_or(HoldfastError::TransactionNotFound { transaction_id: id })?;
            if tx.escrow_status != EscrowStatus::Active {
                return Err(HoldfastError::ClaimLost {
                    transaction_id: id,
                    expected: EscrowStatus::Active,
                });
            }
            tx.escrow_status = EscrowStatus::Disputed;
            tx.disputed_by = Some(by.clone());
            tx.disputed_at = Some(at);
            tx.clone()
        };
        self.push_history(id, EscrowStatus::Disputed).await;
        Ok(updated)
    }

    async fn revert_claim(
        &self,
        id: TransactionId,
        from: EscrowStatus,
        back_to: EscrowStatus,
    ) -> Result<Transaction> {
        self.claim(id, from, back_to).await
    }

    async fn record_resolution(
        &self,
        id: TransactionId,
        from: EscrowStatus,
        terminal: EscrowStatus,
        resolved_to: &WalletAddress,
        at: DateTime<Utc>,
    ) -> Result<Transaction> {
        if self.fail_next_resolution.swap(false, Ordering::SeqCst) {
            return Err(HoldfastError::ledger("injected resolution write failure"));
        }
        let updated = {
            let mut txs = self.transactions.write().await;
            let tx = txs
                .get_mut(&id)
                .ok_or(HoldfastError::TransactionNotFound { transaction_id: id })?;
            if tx.escrow_status != from {
                return Err(HoldfastError::ClaimLost {
                    transaction_id: id,
                    expected: from,
                });
            }
            tx.escrow_status = terminal;
            tx.resolved_to = Some(resolved_to.clone());
            tx.resolved_at = Some(at);
            tx.clone()
        };
        self.push_history(id, terminal).await;
        Ok(updated)
    }

    async fn append_reputation_event(&self, event: &ReputationEvent) -> Result<ReputationEventId> {
        {
            let mut users = self.users.write().await;
            let user = users.entry(event.wallet.clone()).or_insert_with(|| User {
                wallet: event.wallet.clone(),
                display_name: None,
                reputation: 0,
                created_at: Utc::now(),
            });
            user.reputation += event.delta;
        }
        self.events.write().await.push(event.clone());
        Ok(event.id)
    }

    async fn events_for_wallet(&self, wallet: &WalletAddress) -> Result<Vec<ReputationEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|e| &e.wallet == wallet)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfast_types::ReputationReason;

    async fn seeded_transaction(store: &MemoryLedgerStore) -> Transaction {
        let buyer = WalletAddress::new("0xbuyer");
        store.upsert_user(&buyer).await.unwrap();
        store
            .create_transaction(NewTransaction {
                item_id: ItemId::new(),
                buyer_wallet: buyer,
                escrow_registration: Some(1),
                chain_id: 8453,
                deposit_tx_hash: Some("0xdeadbeef".to_string()),
                escrow_status: EscrowStatus::Active,
                amount_usd: 100.0,
                paid_at: Some(Utc::now()),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn claim_moves_status_once() {
        let store = MemoryLedgerStore::new();
        let tx = seeded_transaction(&store).await;

        let claimed = store
            .claim(tx.id, EscrowStatus::Active, EscrowStatus::Releasing)
            .await
            .unwrap();
        assert_eq!(claimed.escrow_status, EscrowStatus::Releasing);

        let second = store
            .claim(tx.id, EscrowStatus::Active, EscrowStatus::Releasing)
            .await;
        assert!(matches!(second, Err(HoldfastError::ClaimLost { .. })));
    }

    #[tokio::test]
    async fn concurrent_claims_have_one_winner() {
        let store = MemoryLedgerStore::new();
        let tx = seeded_transaction(&store).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let id = tx.id;
            handles.push(tokio::spawn(async move {
                store
                    .claim(id, EscrowStatus::Active, EscrowStatus::Releasing)
                    .await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn history_records_every_write() {
        let store = MemoryLedgerStore::new();
        let tx = seeded_transaction(&store).await;

        store
            .claim(tx.id, EscrowStatus::Active, EscrowStatus::Releasing)
            .await
            .unwrap();
        store
            .revert_claim(tx.id, EscrowStatus::Releasing, EscrowStatus::Active)
            .await
            .unwrap();

        let history = store.status_history(tx.id).await;
        assert_eq!(
            history,
            vec![
                EscrowStatus::Active,
                EscrowStatus::Releasing,
                EscrowStatus::Active,
            ]
        );
    }

    #[tokio::test]
    async fn reputation_event_materializes_sum() {
        let store = MemoryLedgerStore::new();
        let tx = seeded_transaction(&store).await;
        let seller = WalletAddress::new("0xseller");

        store
            .append_reputation_event(&ReputationEvent {
                id: ReputationEventId::new(),
                wallet: seller.clone(),
                delta: -60,
                reason: ReputationReason::DisputeRefunded,
                transaction_id: tx.id,
                amount_usd: 100.0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let user = store.get_user(&seller).await.unwrap();
        assert_eq!(user.reputation, -60);
        assert_eq!(store.events_for_wallet(&seller).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn injected_resolution_failure_fires_once() {
        let store = MemoryLedgerStore::new();
        let tx = seeded_transaction(&store).await;
        store
            .claim(tx.id, EscrowStatus::Active, EscrowStatus::Releasing)
            .await
            .unwrap();

        store.fail_next_resolution();
        let seller = WalletAddress::new("0xseller");
        let first = store
            .record_resolution(
                tx.id,
                EscrowStatus::Releasing,
                EscrowStatus::Released,
                &seller,
                Utc::now(),
            )
            .await;
        assert!(matches!(first, Err(HoldfastError::Ledger { .. })));

        let second = store
            .record_resolution(
                tx.id,
                EscrowStatus::Releasing,
                EscrowStatus::Released,
                &seller,
                Utc::now(),
            )
            .await;
        assert!(second.is_ok());
    }
}
