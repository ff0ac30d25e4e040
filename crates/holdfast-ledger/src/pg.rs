//! PostgreSQL ledger store
//!
//! Every claim is one `UPDATE ... WHERE id = $1 AND escrow_status = $2 ...
//! RETURNING *` round trip. Postgres row-level atomicity makes that the
//! compare-and-swap; no application-level locking exists anywhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use uuid::Uuid;

use holdfast_types::{
    EscrowStatus, HoldfastError, Item, ItemId, ReputationEvent, ReputationEventId, Result,
    Transaction, TransactionId, User, WalletAddress,
};

use crate::config::LedgerConfig;
use crate::models::{DbItem, DbReputationEvent, DbTransaction, DbUser};
use crate::store::{LedgerStore, NewTransaction};

/// PostgreSQL-backed [`LedgerStore`]
pub struct PgLedgerStore {
    pool: PgPool,
}

fn db_err(e: sqlx::Error) -> HoldfastError {
    HoldfastError::ledger(e.to_string())
}

impl PgLedgerStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to PostgreSQL
    pub async fn connect(config: &LedgerConfig) -> Result<Self> {
        info!("Connecting to PostgreSQL: {}", config.database_url_masked());
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(db_err)?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running ledger migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| HoldfastError::ledger(e.to_string()))?;
        info!("Migrations complete");
        Ok(())
    }

    /// Distinguish "row gone" from "claim lost" after a zero-row update.
    /// Read-only, failure path only; the claim itself stays one round trip.
    async fn claim_failure(&self, id: TransactionId, expected: EscrowStatus) -> HoldfastError {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await;
        match exists {
            Ok(0) => HoldfastError::TransactionNotFound { transaction_id: id },
            Ok(_) => HoldfastError::ClaimLost {
                transaction_id: id,
                expected,
            },
            Err(e) => db_err(e),
        }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    async fn create_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, title, price_usd, escrow_duration_secs, seller_wallet, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.title)
        .bind(item.price_usd)
        .bind(item.escrow_duration_secs)
        .bind(item.seller_wallet.as_str())
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Item> {
        let row = sqlx::query_as::<_, DbItem>("SELECT * FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(HoldfastError::ItemNotFound { item_id: id })?;
        Ok(row.into())
    }

    async fn upsert_user(&self, wallet: &WalletAddress) -> Result<User> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
            INSERT INTO users (wallet, reputation, created_at)
            VALUES ($1, 0, NOW())
            ON CONFLICT (wallet) DO UPDATE SET wallet = EXCLUDED.wallet
            RETURNING *
            "#,
        )
        .bind(wallet.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    async fn get_user(&self, wallet: &WalletAddress) -> Result<User> {
        let row = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE wallet = $1")
            .bind(wallet.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| HoldfastError::UserNotFound {
                wallet: wallet.to_string(),
            })?;
        Ok(row.into())
    }

    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        let row = sqlx::query_as::<_, DbTransaction>(
            r#"
            INSERT INTO transactions
                (id, item_id, buyer_wallet, escrow_registration, chain_id, deposit_tx_hash,
                 escrow_status, amount_usd, created_at, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.item_id.as_uuid())
        .bind(new.buyer_wallet.as_str())
        .bind(new.escrow_registration)
        .bind(new.chain_id)
        .bind(&new.deposit_tx_hash)
        .bind(new.escrow_status.as_str())
        .bind(new.amount_usd)
        .bind(new.paid_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.try_into()
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let row = sqlx::query_as::<_, DbTransaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(HoldfastError::TransactionNotFound { transaction_id: id })?;
        row.try_into()
    }

    async fn list_active(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, DbTransaction>(
            "SELECT * FROM transactions WHERE escrow_status = 'active' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn set_timer(
        &self,
        id: TransactionId,
        handle: &str,
        release_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let row = sqlx::query_as::<_, DbTransaction>(
            r#"
            UPDATE transactions SET timer_handle = $2, release_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(handle)
        .bind(release_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(HoldfastError::TransactionNotFound { transaction_id: id })?;
        row.try_into()
    }

    async fn claim(
        &self,
        id: TransactionId,
        from: EscrowStatus,
        to: EscrowStatus,
    ) -> Result<Transaction> {
        let row = sqlx::query_as::<_, DbTransaction>(
            r#"
            UPDATE transactions SET escrow_status = $3
            WHERE id = $1 AND escrow_status = $2
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        match row {
            Some(row) => row.try_into(),
            None => Err(self.claim_failure(id, from).await),
        }
    }

    async fn claim_dispute(
        &self,
        id: TransactionId,
        by: &WalletAddress,
        at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let row = sqlx::query_as::<_, DbTransaction>(
            r#"
            UPDATE transactions
            SET escrow_status = 'disputed', disputed_by = $2, disputed_at = $3
            WHERE id = $1 AND escrow_status = 'active'
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(by.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        match row {
            Some(row) => row.try_into(),
            None => Err(self.claim_failure(id, EscrowStatus::Active).await),
        }
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
        let row = sqlx::query_as::<_, DbTransaction>(
            r#"
            UPDATE transactions
            SET escrow_status = $3, resolved_to = $4, resolved_at = $5
            WHERE id = $1 AND escrow_status = $2
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(terminal.as_str())
        .bind(resolved_to.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        match row {
            Some(row) => row.try_into(),
            None => Err(self.claim_failure(id, from).await),
        }
    }

    async fn append_reputation_event(&self, event: &ReputationEvent) -> Result<ReputationEventId> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO reputation_events
                (id, wallet, delta, reason, transaction_id, amount_usd, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.wallet.as_str())
        .bind(event.delta)
        .bind(event.reason.as_str())
        .bind(event.transaction_id.as_uuid())
        .bind(event.amount_usd)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        // Materialize the accumulator in the same transaction
        sqlx::query(
            r#"
            INSERT INTO users (wallet, reputation, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (wallet) DO UPDATE SET reputation = users.reputation + EXCLUDED.reputation
            "#,
        )
        .bind(event.wallet.as_str())
        .bind(event.delta)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(event.id)
    }

    async fn events_for_wallet(&self, wallet: &WalletAddress) -> Result<Vec<ReputationEvent>> {
        let rows = sqlx::query_as::<_, DbReputationEvent>(
            "SELECT * FROM reputation_events WHERE wallet = $1 ORDER BY created_at",
        )
        .bind(wallet.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
