//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use holdfast_types::{
    EscrowStatus, HoldfastError, Item, ReputationEvent, ReputationReason, Transaction, User,
    WalletAddress,
};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct DbItem {
    pub id: Uuid,
    pub title: String,
    pub price_usd: f64,
    pub escrow_duration_secs: i64,
    pub seller_wallet: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbItem> for Item {
    fn from(row: DbItem) -> Self {
        Item {
            id: row.id.into(),
            title: row.title,
            price_usd: row.price_usd,
            escrow_duration_secs: row.escrow_duration_secs,
            seller_wallet: WalletAddress::new(row.seller_wallet),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub wallet: String,
    pub display_name: Option<String>,
    pub reputation: i64,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            wallet: WalletAddress::new(row.wallet),
            display_name: row.display_name,
            reputation: row.reputation,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTransaction {
    pub id: Uuid,
    pub item_id: Uuid,
    pub buyer_wallet: String,
    pub escrow_registration: Option<i64>,
    pub chain_id: i64,
    pub deposit_tx_hash: Option<String>,
    pub escrow_status: String,
    pub timer_handle: Option<String>,
    pub release_at: Option<DateTime<Utc>>,
    pub resolved_to: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub disputed_by: Option<String>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub amount_usd: f64,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbTransaction> for Transaction {
    type Error = HoldfastError;

    fn try_from(row: DbTransaction) -> Result<Self, Self::Error> {
        let escrow_status = EscrowStatus::parse(&row.escrow_status).ok_or_else(|| {
            HoldfastError::internal(format!(
                "transaction {} has unknown escrow_status '{}'",
                row.id, row.escrow_status
            ))
        })?;
        Ok(Transaction {
            id: row.id.into(),
            item_id: row.item_id.into(),
            buyer_wallet: WalletAddress::new(row.buyer_wallet),
            escrow_registration: row.escrow_registration,
            chain_id: row.chain_id,
            deposit_tx_hash: row.deposit_tx_hash,
            escrow_status,
            timer_handle: row.timer_handle,
            release_at: row.release_at,
            resolved_to: row.resolved_to.map(WalletAddress::new),
            resolved_at: row.resolved_at,
            disputed_by: row.disputed_by.map(WalletAddress::new),
            disputed_at: row.disputed_at,
            amount_usd: row.amount_usd,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbReputationEvent {
    pub id: Uuid,
    pub wallet: String,
    pub delta: i64,
    pub reason: String,
    pub transaction_id: Uuid,
    pub amount_usd: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbReputationEvent> for ReputationEvent {
    type Error = HoldfastError;

    fn try_from(row: DbReputationEvent) -> Result<Self, Self::Error> {
        let reason = ReputationReason::parse(&row.reason).ok_or_else(|| {
            HoldfastError::internal(format!(
                "reputation event {} has unknown reason '{}'",
                row.id, row.reason
            ))
        })?;
        Ok(ReputationEvent {
            id: row.id.into(),
            wallet: WalletAddress::new(row.wallet),
            delta: row.delta,
            reason,
            transaction_id: row.transaction_id.into(),
            amount_usd: row.amount_usd,
            created_at: row.created_at,
        })
    }
}
