//! Holdfast Escrow Lifecycle Coordinator
//!
//! Keeps three independently-failing systems consistent: the on-chain
//! escrow contract, the external auto-release timer service, and the
//! relational ledger that records authoritative state.
//!
//! All mutual exclusion comes from the ledger's claim protocol, a
//! conditional status update with exactly one winner. The coordinator
//! always claims first and calls the chain second: claims are cheap and
//! reversible, fund movement is neither. A failure after the chain call
//! succeeds is its own loudly-logged error class needing a human, never an
//! automatic compensating call.
//!
//! Components:
//!
//! - [`EscrowCoordinator`]: deposit recording, the auto-release sweep,
//!   dispute initiation, and the reconcile recovery hook
//! - [`DisputeResolver`]: admin-triggered refund/release of disputed
//!   transactions, with reputation penalties and notifications

pub mod config;
pub mod coordinator;
pub mod notify;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::CoordinatorConfig;
pub use coordinator::{DepositRequest, EscrowCoordinator, ReconcileOutcome};
pub use notify::{MemoryNotifier, Notifier, TracingNotifier};
pub use resolver::{DisputeResolver, ResolutionOutcome};
