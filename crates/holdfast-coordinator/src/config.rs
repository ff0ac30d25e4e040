//! Coordinator configuration
//!
//! Threaded explicitly into the coordinator's constructor rather than read
//! from process-wide state, so the claim protocol and chain calls stay
//! testable with fakes.

use serde::{Deserialize, Serialize};

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Chain new deposits are expected on
    pub default_chain_id: i64,
    /// Maximum transactions processed concurrently by one sweep pass
    pub sweep_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_chain_id: 8453,
            sweep_concurrency: 8,
        }
    }
}

impl CoordinatorConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            default_chain_id: std::env::var("CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8453),
            sweep_concurrency: std::env::var("SWEEP_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
        }
    }
}
