//! The reputation recorder
//!
//! Appends dispute penalties as immutable events and detects tier
//! transitions around them. Event writes go through the ledger store so the
//! event and the materialized sum land atomically.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use holdfast_ledger::LedgerStore;
use holdfast_types::{
    ReputationEvent, ReputationEventId, ReputationReason, Resolution, Result, Transaction,
    WalletAddress,
};

use crate::score::{dispute_penalty, RELEASE_BUYER_COEFFICIENT, REFUND_SELLER_COEFFICIENT};
use crate::tier::{Tier, TierLog, TierTransition};

/// Run a fire-and-forget call: attempt it, capture the outcome, log and
/// swallow any failure. Keeps best-effort side effects (notifications, tier
/// logs, timer cancels) from ever failing the operation that spawned them.
pub async fn best_effort<T, F>(label: &'static str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(call = label, error = %e, "best-effort call failed");
            None
        }
    }
}

/// Records reputation events and tier transitions
pub struct ReputationRecorder {
    store: Arc<dyn LedgerStore>,
    tier_log: Arc<dyn TierLog>,
}

impl ReputationRecorder {
    pub fn new(store: Arc<dyn LedgerStore>, tier_log: Arc<dyn TierLog>) -> Self {
        Self { store, tier_log }
    }

    /// Current tier for a wallet; unknown wallets are Standard
    pub async fn tier_of(&self, wallet: &WalletAddress) -> Result<Tier> {
        let score = match self.store.get_user(wallet).await {
            Ok(user) => user.reputation,
            Err(holdfast_types::HoldfastError::UserNotFound { .. }) => 0,
            Err(e) => return Err(e),
        };
        Ok(Tier::from_score(score))
    }

    /// Append an event; the store folds the delta into the wallet's
    /// accumulator atomically.
    pub async fn record_event(
        &self,
        wallet: &WalletAddress,
        delta: i64,
        reason: ReputationReason,
        transaction: &Transaction,
    ) -> Result<ReputationEventId> {
        let event = ReputationEvent {
            id: ReputationEventId::new(),
            wallet: wallet.clone(),
            delta,
            reason,
            transaction_id: transaction.id,
            amount_usd: transaction.amount_usd,
            created_at: Utc::now(),
        };
        self.store.append_reputation_event(&event).await
    }

    /// Penalize the losing party of a resolved dispute and record the
    /// seller's tier transition if the event moved them across a bracket.
    ///
    /// `seller_tier_before` is the snapshot taken before the resolution's
    /// chain call; taking it here instead would race the event write.
    pub async fn penalize_loser(
        &self,
        transaction: &Transaction,
        resolution: Resolution,
        seller_wallet: &WalletAddress,
        seller_tier_before: Tier,
    ) -> Result<ReputationEventId> {
        let (loser, delta, reason) = match resolution {
            Resolution::Refund => (
                seller_wallet,
                dispute_penalty(transaction.amount_usd, REFUND_SELLER_COEFFICIENT),
                ReputationReason::DisputeRefunded,
            ),
            Resolution::Release => (
                &transaction.buyer_wallet,
                dispute_penalty(transaction.amount_usd, RELEASE_BUYER_COEFFICIENT),
                ReputationReason::DisputeReleased,
            ),
        };

        let event_id = self.record_event(loser, delta, reason, transaction).await?;

        let seller_tier_after = self.tier_of(seller_wallet).await?;
        if seller_tier_after != seller_tier_before {
            let transition = TierTransition {
                wallet: seller_wallet.clone(),
                from: seller_tier_before,
                to: seller_tier_after,
                transaction_id: transaction.id,
                occurred_at: Utc::now(),
            };
            best_effort("tier_log", self.tier_log.record_transition(transition)).await;
        }

        Ok(event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfast_ledger::{MemoryLedgerStore, NewTransaction};
    use holdfast_types::{EscrowStatus, HoldfastError, ItemId};
    use crate::tier::MemoryTierLog;

    async fn fixture() -> (
        Arc<MemoryLedgerStore>,
        Arc<MemoryTierLog>,
        ReputationRecorder,
        Transaction,
        WalletAddress,
    ) {
        let store = Arc::new(MemoryLedgerStore::new());
        let tier_log = Arc::new(MemoryTierLog::new());
        let recorder = ReputationRecorder::new(store.clone(), tier_log.clone());

        let buyer = WalletAddress::new("0xbuyer");
        let seller = WalletAddress::new("0xseller");
        store.upsert_user(&buyer).await.unwrap();
        store.upsert_user(&seller).await.unwrap();
        let tx = store
            .create_transaction(NewTransaction {
                item_id: ItemId::new(),
                buyer_wallet: buyer,
                escrow_registration: Some(1),
                chain_id: 8453,
                deposit_tx_hash: None,
                escrow_status: EscrowStatus::Disputed,
                amount_usd: 100.0,
                paid_at: Some(Utc::now()),
            })
            .await
            .unwrap();

        (store, tier_log, recorder, tx, seller)
    }

    #[tokio::test]
    async fn refund_penalizes_seller_harder_than_release_penalizes_buyer() {
        let (store, _, recorder, tx, seller) = fixture().await;

        recorder
            .penalize_loser(&tx, Resolution::Refund, &seller, Tier::Standard)
            .await
            .unwrap();
        recorder
            .penalize_loser(&tx, Resolution::Release, &seller, Tier::Standard)
            .await
            .unwrap();

        let seller_score = store.get_user(&seller).await.unwrap().reputation;
        let buyer_score = store
            .get_user(&tx.buyer_wallet)
            .await
            .unwrap()
            .reputation;
        assert_eq!(seller_score, -60);
        assert_eq!(buyer_score, -24);
        assert!(seller_score.abs() > buyer_score.abs());
    }

    #[tokio::test]
    async fn tier_transition_recorded_when_bracket_changes() {
        let (_, tier_log, recorder, tx, seller) = fixture().await;

        // Seller starts at 0 (Standard); a -60 refund penalty drops them
        // below zero into Probation.
        recorder
            .penalize_loser(&tx, Resolution::Refund, &seller, Tier::Standard)
            .await
            .unwrap();

        let transitions = tier_log.transitions().await;
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].from, Tier::Standard);
        assert_eq!(transitions[0].to, Tier::Probation);
        assert_eq!(transitions[0].wallet, seller);
    }

    #[tokio::test]
    async fn release_leaves_seller_tier_alone() {
        let (_, tier_log, recorder, tx, seller) = fixture().await;

        recorder
            .penalize_loser(&tx, Resolution::Release, &seller, Tier::Standard)
            .await
            .unwrap();

        assert!(tier_log.transitions().await.is_empty());
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        let result: Option<()> = best_effort("test", async {
            Err(HoldfastError::timer("down"))
        })
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn events_are_appended_not_replaced() {
        let (store, _, recorder, tx, seller) = fixture().await;

        recorder
            .penalize_loser(&tx, Resolution::Refund, &seller, Tier::Standard)
            .await
            .unwrap();
        recorder
            .penalize_loser(&tx, Resolution::Refund, &seller, Tier::Probation)
            .await
            .unwrap();

        let events = store.events_for_wallet(&seller).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(store.get_user(&seller).await.unwrap().reputation, -120);
    }
}
