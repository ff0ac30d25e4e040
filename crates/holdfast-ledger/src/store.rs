//! The ledger store trait
//!
//! Mutual exclusion across the sweep, dispute, and admin-resolve triggers is
//! achieved entirely through the conditional-update methods here. None of
//! them are read-modify-write: each is a single compare-and-swap at the
//! storage layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use holdfast_types::{
    EscrowStatus, Item, ItemId, ReputationEvent, ReputationEventId, Result, Transaction,
    TransactionId, User, WalletAddress,
};

/// Input for creating a transaction row
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub item_id: ItemId,
    pub buyer_wallet: WalletAddress,
    pub escrow_registration: Option<i64>,
    pub chain_id: i64,
    pub deposit_tx_hash: Option<String>,
    pub escrow_status: EscrowStatus,
    pub amount_usd: f64,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Authoritative store for marketplace state
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Liveness probe of the backing store
    async fn ping(&self) -> bool {
        true
    }

    // ========================================================================
    // Items & users
    // ========================================================================

    /// Persist a new item listing
    async fn create_item(&self, item: &Item) -> Result<()>;

    /// Fetch an item by id
    async fn get_item(&self, id: ItemId) -> Result<Item>;

    /// Fetch a user, creating the record on first contact
    async fn upsert_user(&self, wallet: &WalletAddress) -> Result<User>;

    /// Fetch a user by wallet
    async fn get_user(&self, wallet: &WalletAddress) -> Result<User>;

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Create a transaction row; returns the stored row
    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction>;

    /// Fetch a transaction by id
    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction>;

    /// All transactions currently in `active`
    async fn list_active(&self) -> Result<Vec<Transaction>>;

    /// Record the external timer registration for a transaction
    async fn set_timer(
        &self,
        id: TransactionId,
        handle: &str,
        release_at: DateTime<Utc>,
    ) -> Result<Transaction>;

    // ========================================================================
    // Claim protocol
    // ========================================================================

    /// Atomically move `from -> to` for one transaction.
    ///
    /// Succeeds only if the row's status still equals `from`; otherwise
    /// returns [`HoldfastError::ClaimLost`] (or `TransactionNotFound` if the
    /// row does not exist at all).
    ///
    /// [`HoldfastError::ClaimLost`]: holdfast_types::HoldfastError::ClaimLost
    async fn claim(
        &self,
        id: TransactionId,
        from: EscrowStatus,
        to: EscrowStatus,
    ) -> Result<Transaction>;

    /// Atomically claim `active -> disputed`, recording initiator and time
    /// in the same update.
    async fn claim_dispute(
        &self,
        id: TransactionId,
        by: &WalletAddress,
        at: DateTime<Utc>,
    ) -> Result<Transaction>;

    /// Revert a failed claim back to its prior state. Same primitive as
    /// [`claim`], pointed backwards.
    ///
    /// [`claim`]: LedgerStore::claim
    async fn revert_claim(
        &self,
        id: TransactionId,
        from: EscrowStatus,
        back_to: EscrowStatus,
    ) -> Result<Transaction>;

    /// Terminal write: `claim state -> released/refunded` with resolution
    /// target and timestamp. Carries the same status precondition, so a
    /// terminal state can be reached at most once.
    async fn record_resolution(
        &self,
        id: TransactionId,
        from: EscrowStatus,
        terminal: EscrowStatus,
        resolved_to: &WalletAddress,
        at: DateTime<Utc>,
    ) -> Result<Transaction>;

    // ========================================================================
    // Reputation
    // ========================================================================

    /// Append an immutable reputation event and fold its delta into the
    /// user's materialized accumulator, atomically.
    async fn append_reputation_event(&self, event: &ReputationEvent) -> Result<ReputationEventId>;

    /// All events for a wallet, oldest first
    async fn events_for_wallet(&self, wallet: &WalletAddress) -> Result<Vec<ReputationEvent>>;
}
