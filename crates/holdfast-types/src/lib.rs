//! Holdfast Types - Canonical domain types for the escrow marketplace
//!
//! This crate contains all foundational types for Holdfast with zero
//! dependencies on other holdfast crates:
//!
//! - Identity types (TransactionId, ItemId, WalletAddress, ...)
//! - The escrow status state machine and the Transaction record
//! - Marketplace records (Item, User)
//! - Reputation event types
//! - Error types with API error codes
//!
//! # Architectural invariants
//!
//! 1. `escrow_status` moves only along defined edges; every terminal write
//!    passes through a claim state first
//! 2. `escrow_registration` is immutable once set
//! 3. A transaction resolves (released/refunded) at most once
//! 4. Reputation events are append-only; the accumulator is a materialized
//!    sum over them

pub mod error;
pub mod escrow;
pub mod identity;
pub mod market;
pub mod reputation;

pub use error::*;
pub use escrow::*;
pub use identity::*;
pub use market::*;
pub use reputation::*;

/// Version of the Holdfast types schema
pub const TYPES_VERSION: &str = "0.1.0";
