//! Reputation event types
//!
//! Events are append-only: never updated, never deleted. A user's aggregate
//! reputation is a materialized sum over their events.

use crate::{ReputationEventId, TransactionId, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason code for a reputation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationReason {
    /// Escrow auto-released or released by resolution; sale completed
    SaleCompleted,
    /// Dispute resolved as refund; penalty against the seller
    DisputeRefunded,
    /// Dispute resolved as release; penalty against the buyer
    DisputeReleased,
}

impl ReputationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaleCompleted => "sale_completed",
            Self::DisputeRefunded => "dispute_refunded",
            Self::DisputeReleased => "dispute_released",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale_completed" => Some(Self::SaleCompleted),
            "dispute_refunded" => Some(Self::DisputeRefunded),
            "dispute_released" => Some(Self::DisputeReleased),
            _ => None,
        }
    }
}

impl fmt::Display for ReputationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable reputation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationEvent {
    /// Event ID
    pub id: ReputationEventId,
    /// Wallet the delta applies to
    pub wallet: WalletAddress,
    /// Signed reputation delta
    pub delta: i64,
    /// Why the delta was applied
    pub reason: ReputationReason,
    /// Transaction that triggered the event
    pub transaction_id: TransactionId,
    /// Dollar amount of the originating transaction
    pub amount_usd: f64,
    /// When the event was appended
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_roundtrip() {
        for reason in [
            ReputationReason::SaleCompleted,
            ReputationReason::DisputeRefunded,
            ReputationReason::DisputeReleased,
        ] {
            assert_eq!(ReputationReason::parse(reason.as_str()), Some(reason));
        }
    }
}
