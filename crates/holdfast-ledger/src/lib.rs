//! Holdfast Ledger Store
//!
//! The authoritative relational record of every escrowed transaction. The
//! store's one concurrency primitive is the conditional update: "set status
//! to X where id = this AND status = expected". Zero rows affected means the
//! caller lost the claim race; there is no read-then-write anywhere.
//!
//! Two implementations:
//!
//! - [`PgLedgerStore`]: PostgreSQL via sqlx, one round trip per claim
//! - [`MemoryLedgerStore`]: in-memory store for tests and fakes, with
//!   status-history capture

pub mod config;
pub mod memory;
pub mod models;
pub mod pg;
pub mod store;

pub use config::LedgerConfig;
pub use memory::MemoryLedgerStore;
pub use pg::PgLedgerStore;
pub use store::{LedgerStore, NewTransaction};
