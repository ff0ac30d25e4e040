//! Marketplace records: items and users

use crate::{ItemId, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum escrow hold duration, in seconds. Per-item policies below this
/// floor are bumped up to it.
pub const MIN_ESCROW_DURATION_SECS: i64 = 600;

/// Hold duration applied when a listing does not set one (3 days)
pub const DEFAULT_ESCROW_DURATION_SECS: i64 = 259_200;

/// A marketplace item
///
/// Price is immutable after creation and items are never deleted: historical
/// transactions reference them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item ID
    pub id: ItemId,
    /// Listing title
    pub title: String,
    /// Price in dollars
    pub price_usd: f64,
    /// Seconds funds are held in escrow before auto-release
    pub escrow_duration_secs: i64,
    /// Seller's wallet (canonical lowercase)
    pub seller_wallet: WalletAddress,
    /// When the item was listed
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Escrow duration with the configured floor applied
    pub fn effective_escrow_duration_secs(&self) -> i64 {
        self.escrow_duration_secs.max(MIN_ESCROW_DURATION_SECS)
    }
}

/// A marketplace user, keyed by wallet address
///
/// Upserted on first payment or listing. `reputation` is a materialized sum
/// over reputation events and is never written directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Wallet address (canonical lowercase, the primary key)
    pub wallet: WalletAddress,
    /// Optional display name
    pub display_name: Option<String>,
    /// Reputation accumulator
    pub reputation: i64,
    /// When the user record was created
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escrow_duration_floor() {
        let item = Item {
            id: ItemId::new(),
            title: "test".to_string(),
            price_usd: 25.0,
            escrow_duration_secs: 10,
            seller_wallet: WalletAddress::new("0xseller"),
            created_at: Utc::now(),
        };
        assert_eq!(item.effective_escrow_duration_secs(), MIN_ESCROW_DURATION_SECS);
    }

    #[test]
    fn test_escrow_duration_above_floor() {
        let item = Item {
            id: ItemId::new(),
            title: "test".to_string(),
            price_usd: 25.0,
            escrow_duration_secs: 86_400,
            seller_wallet: WalletAddress::new("0xseller"),
            created_at: Utc::now(),
        };
        assert_eq!(item.effective_escrow_duration_secs(), 86_400);
    }
}
