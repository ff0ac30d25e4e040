//! Mock chain gateway for tests
//!
//! Holds deposit slots in memory, counts release/refund calls, and can be
//! scripted to fail the next call. Releasing or refunding zeroes the slot,
//! mirroring the contract's behavior.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use holdfast_types::{HoldfastError, Result, WalletAddress};

use crate::gateway::{ChainGateway, EscrowDeposit};

#[derive(Clone, Default)]
pub struct MockChainGateway {
    slots: Arc<Mutex<HashMap<(i64, i64), EscrowDeposit>>>,
    release_calls: Arc<AtomicUsize>,
    refund_calls: Arc<AtomicUsize>,
    fail_next_release: Arc<AtomicBool>,
    fail_next_refund: Arc<AtomicBool>,
}

impl MockChainGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a funded deposit slot
    pub async fn fund(&self, registration: i64, chain_id: i64, depositor: &WalletAddress, value: u128) {
        self.slots.lock().await.insert(
            (registration, chain_id),
            EscrowDeposit {
                registration,
                depositor: depositor.clone(),
                value,
            },
        );
    }

    /// Remaining value in a slot, if the registration exists
    pub async fn slot_value(&self, registration: i64, chain_id: i64) -> Option<u128> {
        self.slots
            .lock()
            .await
            .get(&(registration, chain_id))
            .map(|d| d.value)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn refund_calls(&self) -> usize {
        self.refund_calls.load(Ordering::SeqCst)
    }

    /// Make the next release call revert
    pub fn fail_next_release(&self) {
        self.fail_next_release.store(true, Ordering::SeqCst);
    }

    /// Make the next refund call revert
    pub fn fail_next_refund(&self) {
        self.fail_next_refund.store(true, Ordering::SeqCst);
    }

    async fn drain(
        &self,
        action: &'static str,
        registration: i64,
        chain_id: i64,
        fail_flag: &AtomicBool,
    ) -> Result<String> {
        if fail_flag.swap(false, Ordering::SeqCst) {
            return Err(HoldfastError::ChainCall {
                action,
                registration,
                message: "execution reverted (scripted)".to_string(),
            });
        }
        let mut slots = self.slots.lock().await;
        let slot = slots.get_mut(&(registration, chain_id)).ok_or_else(|| {
            HoldfastError::ChainCall {
                action,
                registration,
                message: "unknown registration".to_string(),
            }
        })?;
        if slot.value == 0 {
            return Err(HoldfastError::ChainCall {
                action,
                registration,
                message: "deposit already settled".to_string(),
            });
        }
        slot.value = 0;
        Ok(format!("0x{}{:08x}", action, registration))
    }
}

#[async_trait]
impl ChainGateway for MockChainGateway {
    async fn deposit(&self, registration: i64, chain_id: i64) -> Result<Option<EscrowDeposit>> {
        Ok(self.slots.lock().await.get(&(registration, chain_id)).cloned())
    }

    async fn release(&self, registration: i64, chain_id: i64) -> Result<String> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.drain("release", registration, chain_id, &self.fail_next_release)
            .await
    }

    async fn refund(&self, registration: i64, chain_id: i64) -> Result<String> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        self.drain("refund", registration, chain_id, &self.fail_next_refund)
            .await
    }
}
