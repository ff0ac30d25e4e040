//! Escrow lifecycle types for Holdfast
//!
//! The escrow status state machine and the Transaction record it governs.
//! Every transition into a working state (`releasing`, `refunding`,
//! `disputed`) is a claim: a conditional update that succeeds for exactly
//! one caller.

use crate::{ItemId, TransactionId, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a transaction's escrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// Escrow not used for this purchase
    None,
    /// Funds locked on-chain, auto-release timer pending
    Active,
    /// Claimed for release, chain call in flight
    Releasing,
    /// Buyer disputed before auto-release
    Disputed,
    /// Claimed for refund, chain call in flight
    Refunding,
    /// Funds released to the seller
    Released,
    /// Funds refunded to the buyer
    Refunded,
}

impl EscrowStatus {
    /// Check if this is a terminal state (no further transitions defined)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::None | Self::Released | Self::Refunded)
    }

    /// Check if this is an intermediate claim state
    pub fn is_claim_state(&self) -> bool {
        matches!(self, Self::Releasing | Self::Refunding | Self::Disputed)
    }

    /// The terminal state a claim state resolves into, if any
    pub fn terminal_of_claim(&self) -> Option<EscrowStatus> {
        match self {
            Self::Releasing => Some(Self::Released),
            Self::Refunding => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Storage representation (also the wire form)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Active => "active",
            Self::Releasing => "releasing",
            Self::Disputed => "disputed",
            Self::Refunding => "refunding",
            Self::Released => "released",
            Self::Refunded => "refunded",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "active" => Some(Self::Active),
            "releasing" => Some(Self::Releasing),
            "disputed" => Some(Self::Disputed),
            "refunding" => Some(Self::Refunding),
            "released" => Some(Self::Released),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of an admin dispute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Buyer wins: refund the escrowed deposit
    Refund,
    /// Seller wins: release the escrowed deposit
    Release,
}

impl Resolution {
    /// The claim state this resolution moves a disputed transaction into
    pub fn claim_state(&self) -> EscrowStatus {
        match self {
            Self::Refund => EscrowStatus::Refunding,
            Self::Release => EscrowStatus::Releasing,
        }
    }

    /// The terminal state this resolution ends in
    pub fn terminal_state(&self) -> EscrowStatus {
        match self {
            Self::Refund => EscrowStatus::Refunded,
            Self::Release => EscrowStatus::Released,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refund => write!(f, "refund"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// An escrowed marketplace transaction
///
/// The only shared mutable resource in the core. Mutated exclusively
/// through the ledger store's claim protocol; `escrow_registration` is
/// immutable once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: TransactionId,
    /// The item being traded
    pub item_id: ItemId,
    /// Buyer's wallet (canonical lowercase)
    pub buyer_wallet: WalletAddress,
    /// On-chain escrow deposit registration handle
    pub escrow_registration: Option<i64>,
    /// Chain the deposit lives on
    pub chain_id: i64,
    /// Hash of the on-chain deposit transaction
    pub deposit_tx_hash: Option<String>,
    /// Current escrow status
    pub escrow_status: EscrowStatus,
    /// External timer service handle for auto-release
    pub timer_handle: Option<String>,
    /// Scheduled auto-release time
    pub release_at: Option<DateTime<Utc>>,
    /// Address funds were resolved to (set once, on terminal write)
    pub resolved_to: Option<WalletAddress>,
    /// When the escrow reached a terminal state
    pub resolved_at: Option<DateTime<Utc>>,
    /// Wallet that initiated the dispute (always the verified buyer)
    pub disputed_by: Option<WalletAddress>,
    /// When the dispute was initiated
    pub disputed_at: Option<DateTime<Utc>>,
    /// Purchase amount in dollars at time of payment
    pub amount_usd: f64,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// When the buyer's deposit was confirmed
    pub paid_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Check if this transaction can still be disputed by its buyer
    pub fn is_disputable(&self) -> bool {
        self.escrow_status == EscrowStatus::Active
    }
}

/// Per-transaction outcome of one auto-release sweep pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepOutcome {
    /// Timer fired, claim won, funds released
    Released,
    /// Timer has not fired yet
    Pending,
    /// Another process claimed the transaction first
    AlreadyClaimed,
    /// Chain call or ledger write failed
    Error,
    /// No timer handle registered for this transaction
    MissingRegistration,
}

impl fmt::Display for SweepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Released => "released",
            Self::Pending => "pending",
            Self::AlreadyClaimed => "already_claimed",
            Self::Error => "error",
            Self::MissingRegistration => "missing_registration",
        };
        write!(f, "{}", s)
    }
}

/// One row of a sweep's outcome list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub transaction_id: TransactionId,
    pub outcome: SweepOutcome,
}
