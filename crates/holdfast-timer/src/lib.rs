//! Holdfast Timer Service client
//!
//! Wraps the external scheduled-transaction service that fires auto-release
//! timers. The service accepts "fire no earlier than T" registrations and
//! answers "has it fired" polls.
//!
//! A fired timer is a necessary but not sufficient signal: polls can be
//! stale or duplicated across concurrent sweep runs, so the coordinator
//! must still win its ledger claim before acting on one.

pub mod client;
pub mod memory;
pub mod service;

pub use client::{HttpTimerService, TimerConfig};
pub use memory::MemoryTimerService;
pub use service::{TimerRegistration, TimerService, TimerStatus};
