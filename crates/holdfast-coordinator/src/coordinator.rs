//! The escrow lifecycle coordinator
//!
//! Invoked by independent, possibly-overlapping triggers: the periodic
//! auto-release sweep and interactive dispute actions, potentially in
//! separate processes. Nothing here takes an in-process lock for mutual
//! exclusion; every transition is won or lost at the ledger's conditional
//! update.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use holdfast_chain::ChainGateway;
use holdfast_ledger::{LedgerStore, NewTransaction};
use holdfast_reputation::{best_effort, sale_reward, ReputationRecorder};
use holdfast_timer::TimerService;
use holdfast_types::{
    EscrowStatus, HoldfastError, ItemId, ReputationReason, Result, SweepOutcome, SweepReport,
    Transaction, TransactionId, WalletAddress,
};

use crate::config::CoordinatorConfig;

/// A buyer's on-chain deposit, ready to be recorded
#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub item_id: ItemId,
    pub buyer_wallet: WalletAddress,
    pub escrow_registration: i64,
    pub chain_id: i64,
    pub deposit_tx_hash: String,
}

/// What `reconcile` did to a stuck transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Chain shows the deposit settled; the terminal write was completed
    Finalized(EscrowStatus),
    /// Chain still holds the deposit; the claim was reverted
    Reverted(EscrowStatus),
    /// Transaction was not stuck in an in-flight claim state
    NoAction,
}

/// Orchestrates the escrow state machine over the ledger store, chain
/// gateway, and timer service
pub struct EscrowCoordinator {
    store: Arc<dyn LedgerStore>,
    chain: Arc<dyn ChainGateway>,
    timers: Arc<dyn TimerService>,
    recorder: Arc<ReputationRecorder>,
    config: CoordinatorConfig,
}

impl EscrowCoordinator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        chain: Arc<dyn ChainGateway>,
        timers: Arc<dyn TimerService>,
        recorder: Arc<ReputationRecorder>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            chain,
            timers,
            recorder,
            config,
        }
    }

    // ========================================================================
    // Deposit recording
    // ========================================================================

    /// Record a buyer's on-chain deposit: upsert the buyer, create the
    /// `active` transaction row, and register the auto-release timer.
    ///
    /// Timer registration is allowed to fail: the row is kept with a NULL
    /// handle and the sweep reports it as `missing_registration` until an
    /// operator repairs it. The buyer's payment record must not depend on
    /// the scheduler being up.
    pub async fn record_deposit(&self, req: DepositRequest) -> Result<Transaction> {
        let item = self.store.get_item(req.item_id).await?;

        let deposit = self
            .chain
            .deposit(req.escrow_registration, req.chain_id)
            .await?
            .ok_or_else(|| {
                HoldfastError::invalid_input(
                    "escrow_registration",
                    format!("no deposit registered under {}", req.escrow_registration),
                )
            })?;
        if !deposit.is_held() {
            return Err(HoldfastError::invalid_input(
                "escrow_registration",
                "deposit already settled on-chain",
            ));
        }

        self.store.upsert_user(&req.buyer_wallet).await?;

        let tx = self
            .store
            .create_transaction(NewTransaction {
                item_id: item.id,
                buyer_wallet: req.buyer_wallet,
                escrow_registration: Some(req.escrow_registration),
                chain_id: req.chain_id,
                deposit_tx_hash: Some(req.deposit_tx_hash),
                escrow_status: EscrowStatus::Active,
                amount_usd: item.price_usd,
                paid_at: Some(Utc::now()),
            })
            .await?;

        let hold = Duration::from_secs(item.effective_escrow_duration_secs() as u64);
        match self.timers.create(tx.id, hold).await {
            Ok(registration) => {
                let tx = self
                    .store
                    .set_timer(tx.id, &registration.handle, registration.fire_at)
                    .await?;
                info!(
                    transaction_id = %tx.id,
                    fire_at = %registration.fire_at,
                    "escrow deposit recorded, auto-release scheduled"
                );
                Ok(tx)
            }
            Err(e) => {
                warn!(
                    transaction_id = %tx.id,
                    error = %e,
                    "timer registration failed; deposit recorded without auto-release"
                );
                Ok(tx)
            }
        }
    }

    // ========================================================================
    // Auto-release sweep
    // ========================================================================

    /// One pass over all `active` transactions. Each is handled
    /// independently with bounded parallelism so one stuck chain call
    /// cannot stall the rest.
    pub async fn sweep(&self) -> Result<Vec<SweepReport>> {
        let active = self.store.list_active().await?;
        if active.is_empty() {
            return Ok(Vec::new());
        }
        info!(count = active.len(), "auto-release sweep starting");

        let reports = stream::iter(active)
            .map(|tx| self.sweep_transaction(tx))
            .buffer_unordered(self.config.sweep_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        Ok(reports)
    }

    /// Advance one transaction from an `active` snapshot. The snapshot may
    /// be stale; the claim decides.
    pub async fn sweep_transaction(&self, tx: Transaction) -> SweepReport {
        let outcome = self.try_release(&tx).await;
        SweepReport {
            transaction_id: tx.id,
            outcome,
        }
    }

    async fn try_release(&self, tx: &Transaction) -> SweepOutcome {
        let (Some(handle), Some(registration)) = (tx.timer_handle.as_deref(), tx.escrow_registration)
        else {
            warn!(transaction_id = %tx.id, "active transaction without timer or registration");
            return SweepOutcome::MissingRegistration;
        };

        match self.timers.poll(handle).await {
            Ok(status) if !status.fired => return SweepOutcome::Pending,
            Ok(_) => {}
            Err(e) => {
                warn!(transaction_id = %tx.id, error = %e, "timer poll failed");
                return SweepOutcome::Error;
            }
        }

        // Fired is necessary but not sufficient: the claim is the arbiter.
        let claimed = match self
            .store
            .claim(tx.id, EscrowStatus::Active, EscrowStatus::Releasing)
            .await
        {
            Ok(tx) => tx,
            Err(HoldfastError::ClaimLost { .. }) => return SweepOutcome::AlreadyClaimed,
            Err(e) => {
                warn!(transaction_id = %tx.id, error = %e, "release claim failed");
                return SweepOutcome::Error;
            }
        };

        let item = match self.store.get_item(claimed.item_id).await {
            Ok(item) => item,
            Err(e) => {
                warn!(transaction_id = %tx.id, error = %e, "payout lookup failed, reverting claim");
                self.revert_release_claim(tx.id).await;
                return SweepOutcome::Error;
            }
        };

        let tx_hash = match self.chain.release(registration, claimed.chain_id).await {
            Ok(hash) => hash,
            Err(e) => {
                // No on-chain state changed; make the row eligible for the
                // next sweep.
                warn!(transaction_id = %tx.id, error = %e, "chain release failed, reverting claim");
                self.revert_release_claim(tx.id).await;
                return SweepOutcome::Error;
            }
        };

        match self
            .store
            .record_resolution(
                tx.id,
                EscrowStatus::Releasing,
                EscrowStatus::Released,
                &item.seller_wallet,
                Utc::now(),
            )
            .await
        {
            Ok(_) => {}
            Err(e) => {
                // Funds already moved. Do not revert the claim and do not
                // retry the chain call; this needs a human.
                error!(
                    transaction_id = %tx.id,
                    tx_hash = %tx_hash,
                    intended = "release",
                    error = %e,
                    "CRITICAL: on-chain release confirmed but terminal ledger write failed; manual reconciliation required"
                );
                return SweepOutcome::Error;
            }
        }

        best_effort(
            "sale_reputation",
            self.recorder.record_event(
                &item.seller_wallet,
                sale_reward(claimed.amount_usd),
                ReputationReason::SaleCompleted,
                &claimed,
            ),
        )
        .await;

        info!(
            transaction_id = %tx.id,
            tx_hash = %tx_hash,
            seller = %item.seller_wallet,
            "escrow auto-released"
        );
        SweepOutcome::Released
    }

    async fn revert_release_claim(&self, id: TransactionId) {
        if let Err(e) = self
            .store
            .revert_claim(id, EscrowStatus::Releasing, EscrowStatus::Active)
            .await
        {
            error!(transaction_id = %id, error = %e, "failed to revert release claim");
        }
    }

    // ========================================================================
    // Dispute initiation
    // ========================================================================

    /// Buyer-triggered dispute. Must win the `active -> disputed` claim
    /// before the sweep claims the row for release.
    pub async fn open_dispute(
        &self,
        id: TransactionId,
        caller_wallet: &WalletAddress,
    ) -> Result<Transaction> {
        let tx = self.store.get_transaction(id).await?;

        if &tx.buyer_wallet != caller_wallet {
            return Err(HoldfastError::NotBuyer { transaction_id: id });
        }

        // Claim failure means the transaction already left `active`
        // (released, or another dispute won): not eligible.
        let disputed = self.store.claim_dispute(id, caller_wallet, Utc::now()).await?;

        // The DB status already blocks the sweep; a stale timer firing
        // later loses its claim, so cancel failure is non-fatal.
        if let Some(handle) = disputed.timer_handle.as_deref() {
            if best_effort("timer_cancel", self.timers.cancel(handle))
                .await
                .is_none()
            {
                warn!(transaction_id = %id, "timer cancel failed; relying on claim protocol");
            }
        }

        info!(transaction_id = %id, buyer = %caller_wallet, "dispute opened");
        Ok(disputed)
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Idempotent recovery for a transaction stuck in `releasing` or
    /// `refunding` after a post-chain-success ledger failure.
    ///
    /// Reads the chain deposit slot and either completes the terminal write
    /// (deposit settled) or reverts the claim (deposit still held). Never
    /// issues a chain mutation, so repeated or concurrent runs stay safe;
    /// every write is still claim-guarded.
    pub async fn reconcile(&self, id: TransactionId) -> Result<ReconcileOutcome> {
        let tx = self.store.get_transaction(id).await?;

        let claim_state = tx.escrow_status;
        let Some(terminal) = claim_state.terminal_of_claim() else {
            return Ok(ReconcileOutcome::NoAction);
        };
        let Some(registration) = tx.escrow_registration else {
            warn!(transaction_id = %id, "stuck transaction has no registration to reconcile against");
            return Ok(ReconcileOutcome::NoAction);
        };

        let deposit = self.chain.deposit(registration, tx.chain_id).await?;
        let settled = deposit.map(|d| !d.is_held()).unwrap_or(false);

        if settled {
            let resolved_to = match terminal {
                EscrowStatus::Refunded => tx.buyer_wallet.clone(),
                _ => self.store.get_item(tx.item_id).await?.seller_wallet,
            };
            let updated = self
                .store
                .record_resolution(id, claim_state, terminal, &resolved_to, Utc::now())
                .await?;
            info!(transaction_id = %id, status = %terminal, "reconciled from chain state");
            Ok(ReconcileOutcome::Finalized(updated.escrow_status))
        } else {
            // `releasing` is reachable from both `active` (sweep) and
            // `disputed` (resolver); the dispute marker tells them apart.
            let prior = match claim_state {
                EscrowStatus::Releasing if tx.disputed_at.is_none() => EscrowStatus::Active,
                _ => EscrowStatus::Disputed,
            };
            let reverted = self.store.revert_claim(id, claim_state, prior).await?;
            info!(transaction_id = %id, status = %prior, "reverted stale claim during reconcile");
            Ok(ReconcileOutcome::Reverted(reverted.escrow_status))
        }
    }

}
