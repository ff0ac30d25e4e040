//! The chain gateway trait

use async_trait::async_trait;
use holdfast_types::{Result, WalletAddress};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An escrow deposit slot as recorded on-chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowDeposit {
    /// Registration handle assigned by the contract at deposit time
    pub registration: i64,
    /// Wallet that funded the deposit
    pub depositor: WalletAddress,
    /// Remaining locked value in the slot, in base token units.
    /// Zero once released or refunded.
    pub value: u128,
}

impl EscrowDeposit {
    /// Check if the slot still holds funds
    pub fn is_held(&self) -> bool {
        self.value > 0
    }
}

/// Gateway to the deployed escrow contract
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Look up a deposit slot. `None` if the registration was never created.
    async fn deposit(&self, registration: i64, chain_id: i64) -> Result<Option<EscrowDeposit>>;

    /// Release the deposit to the receiver configured at deposit time.
    /// Waits for confirmation; returns the transaction hash. Errors on
    /// revert or timeout; never returns a hash for an unconfirmed call.
    async fn release(&self, registration: i64, chain_id: i64) -> Result<String>;

    /// Refund the deposit to the depositor. Same confirmation contract as
    /// [`release`].
    ///
    /// [`release`]: ChainGateway::release
    async fn refund(&self, registration: i64, chain_id: i64) -> Result<String>;
}

/// Chain gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Base URL of the signing relay
    pub relay_url: String,
    /// Bound on the confirmation wait
    pub confirm_timeout_secs: u64,
    /// Interval between confirmation polls, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:8545".to_string(),
            confirm_timeout_secs: 90,
            poll_interval_ms: 1_000,
        }
    }
}

impl ChainConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            relay_url: std::env::var("CHAIN_RELAY_URL")
                .unwrap_or_else(|_| "http://localhost:8545".to_string()),
            confirm_timeout_secs: std::env::var("CHAIN_CONFIRM_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(90),
            poll_interval_ms: std::env::var("CHAIN_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000),
        }
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
