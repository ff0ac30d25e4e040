//! Reputation tiers
//!
//! Discrete brackets over the materialized reputation sum. Transitions are
//! appended to an external log for auditing; the log is best-effort and
//! never fails the resolution that triggered it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use holdfast_types::{Result, TransactionId, WalletAddress};

/// A reputation bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Negative score: disputes lost outweigh completed sales
    Probation,
    /// Fresh or unremarkable history
    Standard,
    /// Established positive history
    Trusted,
    /// Long positive history
    Anchor,
}

impl Tier {
    /// Bracket for a reputation score
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s < 0 => Self::Probation,
            s if s < 50 => Self::Standard,
            s if s < 200 => Self::Trusted,
            _ => Self::Anchor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probation => "probation",
            Self::Standard => "standard",
            Self::Trusted => "trusted",
            Self::Anchor => "anchor",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An auditable tier change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTransition {
    pub wallet: WalletAddress,
    pub from: Tier,
    pub to: Tier,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Append-only sink for tier transitions
#[async_trait]
pub trait TierLog: Send + Sync {
    async fn record_transition(&self, transition: TierTransition) -> Result<()>;
}

/// Tier log that emits a structured trace event
#[derive(Debug, Clone, Default)]
pub struct TracingTierLog;

#[async_trait]
impl TierLog for TracingTierLog {
    async fn record_transition(&self, transition: TierTransition) -> Result<()> {
        info!(
            wallet = %transition.wallet,
            from = %transition.from,
            to = %transition.to,
            transaction_id = %transition.transaction_id,
            "reputation tier transition"
        );
        Ok(())
    }
}

/// Recording tier log for tests
#[derive(Clone, Default)]
pub struct MemoryTierLog {
    transitions: Arc<Mutex<Vec<TierTransition>>>,
}

impl MemoryTierLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transitions(&self) -> Vec<TierTransition> {
        self.transitions.lock().await.clone()
    }
}

#[async_trait]
impl TierLog for MemoryTierLog {
    async fn record_transition(&self, transition: TierTransition) -> Result<()> {
        self.transitions.lock().await.push(transition);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_brackets() {
        assert_eq!(Tier::from_score(-1), Tier::Probation);
        assert_eq!(Tier::from_score(0), Tier::Standard);
        assert_eq!(Tier::from_score(49), Tier::Standard);
        assert_eq!(Tier::from_score(50), Tier::Trusted);
        assert_eq!(Tier::from_score(199), Tier::Trusted);
        assert_eq!(Tier::from_score(200), Tier::Anchor);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Probation < Tier::Standard);
        assert!(Tier::Trusted < Tier::Anchor);
    }
}
