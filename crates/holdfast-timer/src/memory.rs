//! In-memory timer service for tests
//!
//! Timers never fire on their own; tests drive them with [`fire`] so
//! coordinator behavior can be exercised deterministically. Cancellation
//! can be scripted to fail for the best-effort paths.
//!
//! [`fire`]: MemoryTimerService::fire

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use holdfast_types::{HoldfastError, Result, TransactionId};

use crate::service::{TimerRegistration, TimerService, TimerStatus};

#[derive(Debug, Clone)]
struct TimerState {
    fire_at: DateTime<Utc>,
    fired_at: Option<DateTime<Utc>>,
    cancelled: bool,
}

/// In-memory [`TimerService`] fake
#[derive(Clone, Default)]
pub struct MemoryTimerService {
    timers: Arc<Mutex<HashMap<String, TimerState>>>,
    fail_cancel: Arc<AtomicBool>,
    fail_create: Arc<AtomicBool>,
}

impl MemoryTimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a timer as fired
    pub async fn fire(&self, handle: &str) {
        if let Some(timer) = self.timers.lock().await.get_mut(handle) {
            timer.fired_at = Some(Utc::now());
        }
    }

    /// Fire every timer whose scheduled time has passed
    pub async fn fire_due(&self) {
        let now = Utc::now();
        for timer in self.timers.lock().await.values_mut() {
            if timer.fired_at.is_none() && !timer.cancelled && timer.fire_at <= now {
                timer.fired_at = Some(now);
            }
        }
    }

    /// Check whether a timer was cancelled
    pub async fn is_cancelled(&self, handle: &str) -> bool {
        self.timers
            .lock()
            .await
            .get(handle)
            .map(|t| t.cancelled)
            .unwrap_or(false)
    }

    /// Make every subsequent cancel call fail
    pub fn fail_cancels(&self) {
        self.fail_cancel.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent create call fail
    pub fn fail_creates(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TimerService for MemoryTimerService {
    async fn create(&self, subject: TransactionId, duration: Duration) -> Result<TimerRegistration> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(HoldfastError::timer("scheduler unavailable (scripted)"));
        }
        let handle = format!("timer_{}_{}", subject.as_uuid(), Uuid::new_v4());
        let fire_at = Utc::now() + chrono::Duration::seconds(duration.as_secs() as i64);
        self.timers.lock().await.insert(
            handle.clone(),
            TimerState {
                fire_at,
                fired_at: None,
                cancelled: false,
            },
        );
        Ok(TimerRegistration { handle, fire_at })
    }

    async fn poll(&self, handle: &str) -> Result<TimerStatus> {
        let timers = self.timers.lock().await;
        let timer = timers
            .get(handle)
            .ok_or_else(|| HoldfastError::timer(format!("unknown handle {}", handle)))?;
        Ok(TimerStatus {
            fired: timer.fired_at.is_some(),
            fired_at: timer.fired_at,
        })
    }

    async fn cancel(&self, handle: &str) -> Result<bool> {
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(HoldfastError::timer("scheduler unavailable (scripted)"));
        }
        let mut timers = self.timers.lock().await;
        match timers.get_mut(handle) {
            Some(timer) if timer.fired_at.is_none() => {
                timer.cancelled = true;
                Ok(true)
            }
            // Already fired (or never existed): nothing to cancel
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timer_fires_only_when_driven() {
        let timers = MemoryTimerService::new();
        let reg = timers
            .create(TransactionId::new(), Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!timers.poll(&reg.handle).await.unwrap().fired);
        timers.fire(&reg.handle).await;
        let status = timers.poll(&reg.handle).await.unwrap();
        assert!(status.fired);
        assert!(status.fired_at.is_some());
    }

    #[tokio::test]
    async fn fire_due_fires_past_due_timers_only() {
        let timers = MemoryTimerService::new();
        let due = timers
            .create(TransactionId::new(), Duration::from_secs(0))
            .await
            .unwrap();
        let later = timers
            .create(TransactionId::new(), Duration::from_secs(3_600))
            .await
            .unwrap();

        timers.fire_due().await;
        assert!(timers.poll(&due.handle).await.unwrap().fired);
        assert!(!timers.poll(&later.handle).await.unwrap().fired);
    }

    #[tokio::test]
    async fn cancel_after_fire_reports_false() {
        let timers = MemoryTimerService::new();
        let reg = timers
            .create(TransactionId::new(), Duration::from_secs(10))
            .await
            .unwrap();
        timers.fire(&reg.handle).await;
        assert!(!timers.cancel(&reg.handle).await.unwrap());
    }

    #[tokio::test]
    async fn scripted_cancel_failure() {
        let timers = MemoryTimerService::new();
        let reg = timers
            .create(TransactionId::new(), Duration::from_secs(10))
            .await
            .unwrap();
        timers.fail_cancels();
        assert!(timers.cancel(&reg.handle).await.is_err());
    }
}
