//! Error types for Holdfast
//!
//! The taxonomy distinguishes expected, recoverable conditions (claim lost,
//! not found) from retriable chain failures and from the one class that can
//! never be retried automatically: a ledger write that failed after an
//! irreversible on-chain action.

use crate::{EscrowStatus, ItemId, Resolution, TransactionId};
use thiserror::Error;

/// Result type for Holdfast operations
pub type Result<T> = std::result::Result<T, HoldfastError>;

/// Holdfast error types
#[derive(Debug, Clone, Error)]
pub enum HoldfastError {
    // ========================================================================
    // Not found
    // ========================================================================

    /// Transaction not found
    #[error("Transaction {transaction_id} not found")]
    TransactionNotFound { transaction_id: TransactionId },

    /// Item not found
    #[error("Item {item_id} not found")]
    ItemNotFound { item_id: ItemId },

    /// User not found
    #[error("User {wallet} not found")]
    UserNotFound { wallet: String },

    // ========================================================================
    // Claim protocol
    // ========================================================================

    /// Conditional update affected zero rows: another process already
    /// transitioned the transaction. The caller lost the race and must not
    /// retry the same logical operation.
    #[error("Claim lost for transaction {transaction_id}: status was not {expected}")]
    ClaimLost {
        transaction_id: TransactionId,
        expected: EscrowStatus,
    },

    /// Caller's wallet does not match the transaction's buyer record
    #[error("Wallet is not the buyer of transaction {transaction_id}")]
    NotBuyer { transaction_id: TransactionId },

    // ========================================================================
    // Chain gateway
    // ========================================================================

    /// On-chain call reverted or could not be submitted. No funds moved;
    /// the claim is reverted and the operation may be retried later.
    #[error("Chain {action} failed for registration {registration}: {message}")]
    ChainCall {
        action: &'static str,
        registration: i64,
        message: String,
    },

    /// Confirmation wait exceeded its bound. Treated identically to a chain
    /// failure: revert the claim, never assume success.
    #[error("Chain {action} for registration {registration} unconfirmed after {waited_secs}s")]
    ChainTimeout {
        action: &'static str,
        registration: i64,
        waited_secs: u64,
    },

    /// Funds moved on-chain but the terminal ledger write failed. Requires
    /// manual reconciliation; a compensating chain call must never be issued
    /// automatically.
    #[error(
        "LEDGER INCONSISTENT: transaction {transaction_id} resolved on-chain ({tx_hash}) as {intended} but the terminal write failed: {message}"
    )]
    LedgerInconsistent {
        transaction_id: TransactionId,
        tx_hash: String,
        intended: Resolution,
        message: String,
    },

    // ========================================================================
    // Collaborators
    // ========================================================================

    /// Ledger store failure (connection, query, constraint)
    #[error("Ledger error: {message}")]
    Ledger { message: String },

    /// Timer service failure
    #[error("Timer service error: {message}")]
    Timer { message: String },

    // ========================================================================
    // General
    // ========================================================================

    /// Unauthorized action
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Invalid input
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl HoldfastError {
    /// Create a ledger error
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Create a timer service error
    pub fn timer(message: impl Into<String>) -> Self {
        Self::Timer {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Expected concurrency outcome: another process owns the transition.
    /// Safe, no action needed, do not retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ClaimLost { .. })
    }

    /// Irreversible side effect with a disagreeing ledger. Needs a human;
    /// never reported with the same code as a conflict.
    pub fn needs_operator(&self) -> bool {
        matches!(self, Self::LedgerInconsistent { .. })
    }

    /// Check if the failed operation may be retried later
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ChainCall { .. } | Self::ChainTimeout { .. } | Self::Ledger { .. } | Self::Timer { .. }
        )
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TransactionNotFound { .. } => "TRANSACTION_NOT_FOUND",
            Self::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            Self::UserNotFound { .. } => "USER_NOT_FOUND",
            Self::ClaimLost { .. } => "CLAIM_LOST",
            Self::NotBuyer { .. } => "NOT_BUYER",
            Self::ChainCall { .. } => "CHAIN_CALL_FAILED",
            Self::ChainTimeout { .. } => "CHAIN_TIMEOUT",
            Self::LedgerInconsistent { .. } => "LEDGER_INCONSISTENT",
            Self::Ledger { .. } => "LEDGER_ERROR",
            Self::Timer { .. } => "TIMER_ERROR",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = HoldfastError::ClaimLost {
            transaction_id: TransactionId::new(),
            expected: EscrowStatus::Active,
        };
        assert_eq!(err.error_code(), "CLAIM_LOST");
        assert!(err.is_conflict());
        assert!(!err.needs_operator());
    }

    #[test]
    fn test_inconsistency_is_not_a_conflict() {
        let err = HoldfastError::LedgerInconsistent {
            transaction_id: TransactionId::new(),
            tx_hash: "0xabc".to_string(),
            intended: Resolution::Release,
            message: "connection reset".to_string(),
        };
        assert!(err.needs_operator());
        assert!(!err.is_conflict());
        assert!(!err.is_retriable());
        assert_ne!(
            err.error_code(),
            HoldfastError::ClaimLost {
                transaction_id: TransactionId::new(),
                expected: EscrowStatus::Disputed,
            }
            .error_code()
        );
    }

    #[test]
    fn test_retriable_errors() {
        assert!(HoldfastError::timer("down").is_retriable());
        assert!(HoldfastError::ChainTimeout {
            action: "release",
            registration: 7,
            waited_secs: 60,
        }
        .is_retriable());
        assert!(!HoldfastError::unauthorized("bad token").is_retriable());
    }
}
