//! The timer service trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use holdfast_types::{Result, TransactionId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A registered timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRegistration {
    /// Opaque handle assigned by the timer service
    pub handle: String,
    /// Earliest time the timer will fire
    pub fire_at: DateTime<Utc>,
}

/// Firing status of a timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub fired: bool,
    pub fired_at: Option<DateTime<Utc>>,
}

/// Client for the external scheduled-timer service
#[async_trait]
pub trait TimerService: Send + Sync {
    /// Register a timer that fires no earlier than `duration` from now
    async fn create(&self, subject: TransactionId, duration: Duration) -> Result<TimerRegistration>;

    /// Check whether a timer has fired
    async fn poll(&self, handle: &str) -> Result<TimerStatus>;

    /// Cancel a timer. Best-effort: returns `false` (or errors) if the
    /// timer already fired or the service is unreachable; callers must not
    /// treat either as fatal.
    async fn cancel(&self, handle: &str) -> Result<bool>;
}
