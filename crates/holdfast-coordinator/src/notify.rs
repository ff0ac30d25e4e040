//! Party notification seam
//!
//! Delivery (Telegram, email, whatever the front end wires in) lives
//! outside the core; the coordinator only ever calls this best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use holdfast_types::{Result, WalletAddress};

/// Best-effort message delivery to a marketplace user
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempt delivery; `false` means the user could not be reached
    async fn notify(&self, wallet: &WalletAddress, message: &str) -> Result<bool>;
}

/// Notifier that only emits a trace event
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, wallet: &WalletAddress, message: &str) -> Result<bool> {
        info!(%wallet, message, "notification");
        Ok(true)
    }
}

/// Recording notifier for tests
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<(WalletAddress, String)>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(WalletAddress, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, wallet: &WalletAddress, message: &str) -> Result<bool> {
        self.sent
            .lock()
            .await
            .push((wallet.clone(), message.to_string()));
        Ok(true)
    }
}
