//! The dispute resolver
//!
//! Invoked by an authenticated admin action with exactly two outcomes:
//! refund (buyer wins) or release (seller wins). One code path serves both
//! the HTTP endpoint and internal admin tooling.
//!
//! Ordering is the same as everywhere else in the coordinator: claim first
//! (cheap, reversible), chain call second (irreversible, never retried),
//! terminal write third. A terminal-write failure after the chain call is
//! the distinct `LedgerInconsistent` class: surfaced to the operator,
//! never compensated on-chain.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use holdfast_chain::ChainGateway;
use holdfast_ledger::LedgerStore;
use holdfast_reputation::{best_effort, ReputationRecorder};
use holdfast_types::{
    EscrowStatus, HoldfastError, Resolution, Result, Transaction, TransactionId, WalletAddress,
};

use crate::notify::Notifier;

/// Result of a successful dispute resolution
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    /// The transaction in its terminal state
    pub transaction: Transaction,
    /// Hash of the confirmed on-chain release/refund
    pub tx_hash: String,
}

/// Resolves disputed transactions on admin instruction
pub struct DisputeResolver {
    store: Arc<dyn LedgerStore>,
    chain: Arc<dyn ChainGateway>,
    recorder: Arc<ReputationRecorder>,
    notifier: Arc<dyn Notifier>,
}

impl DisputeResolver {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        chain: Arc<dyn ChainGateway>,
        recorder: Arc<ReputationRecorder>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            chain,
            recorder,
            notifier,
        }
    }

    /// Resolve a disputed transaction.
    ///
    /// Claim failure means the transaction is not in `disputed` (already
    /// resolved, or being resolved right now) and surfaces as a conflict;
    /// the other process is handling it and the caller must not retry.
    pub async fn resolve(&self, id: TransactionId, resolution: Resolution) -> Result<ResolutionOutcome> {
        let claim_state = resolution.claim_state();
        let claimed = self
            .store
            .claim(id, EscrowStatus::Disputed, claim_state)
            .await?;

        let Some(registration) = claimed.escrow_registration else {
            self.revert(id, claim_state).await;
            return Err(HoldfastError::internal(format!(
                "disputed transaction {} has no escrow registration",
                id
            )));
        };

        let item = match self.store.get_item(claimed.item_id).await {
            Ok(item) => item,
            Err(e) => {
                self.revert(id, claim_state).await;
                return Err(e);
            }
        };

        let payout_to = match resolution {
            Resolution::Refund => claimed.buyer_wallet.clone(),
            Resolution::Release => item.seller_wallet.clone(),
        };

        // Snapshot before the event lands so the bracket change is visible
        let seller_tier_before = match self.recorder.tier_of(&item.seller_wallet).await {
            Ok(tier) => tier,
            Err(e) => {
                self.revert(id, claim_state).await;
                return Err(e);
            }
        };

        // The irreversible step. Not retried: a failure here fails the
        // whole operation atomically from the caller's perspective.
        let chain_result = match resolution {
            Resolution::Refund => self.chain.refund(registration, claimed.chain_id).await,
            Resolution::Release => self.chain.release(registration, claimed.chain_id).await,
        };
        let tx_hash = match chain_result {
            Ok(hash) => hash,
            Err(e) => {
                warn!(transaction_id = %id, %resolution, error = %e, "chain call failed, reverting to disputed");
                self.revert(id, claim_state).await;
                return Err(e);
            }
        };

        let transaction = match self
            .store
            .record_resolution(id, claim_state, resolution.terminal_state(), &payout_to, Utc::now())
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                error!(
                    transaction_id = %id,
                    tx_hash = %tx_hash,
                    intended = %resolution,
                    error = %e,
                    "CRITICAL: dispute resolved on-chain but terminal ledger write failed; manual reconciliation required"
                );
                return Err(HoldfastError::LedgerInconsistent {
                    transaction_id: id,
                    tx_hash,
                    intended: resolution,
                    message: e.to_string(),
                });
            }
        };

        best_effort(
            "dispute_reputation",
            self.recorder
                .penalize_loser(&transaction, resolution, &item.seller_wallet, seller_tier_before),
        )
        .await;

        let message = match resolution {
            Resolution::Refund => format!("Dispute over '{}' resolved: deposit refunded", item.title),
            Resolution::Release => format!("Dispute over '{}' resolved: deposit released", item.title),
        };
        best_effort(
            "notify_buyer",
            self.notifier.notify(&transaction.buyer_wallet, &message),
        )
        .await;
        best_effort(
            "notify_seller",
            self.notifier.notify(&item.seller_wallet, &message),
        )
        .await;

        info!(
            transaction_id = %id,
            %resolution,
            tx_hash = %tx_hash,
            payout_to = %payout_to,
            "dispute resolved"
        );
        Ok(ResolutionOutcome { transaction, tx_hash })
    }

    async fn revert(&self, id: TransactionId, from: EscrowStatus) {
        if let Err(e) = self
            .store
            .revert_claim(id, from, EscrowStatus::Disputed)
            .await
        {
            error!(transaction_id = %id, error = %e, "failed to revert resolution claim");
        }
    }
}
