//! HTTP timer service client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use holdfast_types::{HoldfastError, Result, TransactionId};

use crate::service::{TimerRegistration, TimerService, TimerStatus};

/// Timer service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Base URL of the scheduler
    pub scheduler_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            scheduler_url: "http://localhost:9090".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl TimerConfig {
    pub fn from_env() -> Self {
        Self {
            scheduler_url: std::env::var("TIMER_SCHEDULER_URL")
                .unwrap_or_else(|_| "http://localhost:9090".to_string()),
            request_timeout_secs: std::env::var("TIMER_REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }
}

/// HTTP-backed [`TimerService`]
pub struct HttpTimerService {
    client: Client,
    config: TimerConfig,
}

#[derive(Debug, Serialize)]
struct CreateTimerRequest {
    subject: String,
    delay_secs: u64,
}

#[derive(Debug, Deserialize)]
struct CreateTimerResponse {
    handle: String,
    fire_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    fired: bool,
    fired_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CancelResponse {
    cancelled: bool,
}

impl HttpTimerService {
    pub fn new(config: TimerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| HoldfastError::internal(format!("http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TimerService for HttpTimerService {
    async fn create(&self, subject: TransactionId, duration: Duration) -> Result<TimerRegistration> {
        let url = format!("{}/timers", self.config.scheduler_url);
        let resp = self
            .client
            .post(&url)
            .json(&CreateTimerRequest {
                subject: subject.to_string(),
                delay_secs: duration.as_secs(),
            })
            .send()
            .await
            .map_err(|e| HoldfastError::timer(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(HoldfastError::timer(format!(
                "scheduler returned {}",
                resp.status()
            )));
        }

        let body: CreateTimerResponse = resp
            .json()
            .await
            .map_err(|e| HoldfastError::timer(e.to_string()))?;
        debug!(handle = %body.handle, fire_at = %body.fire_at, "timer registered");
        Ok(TimerRegistration {
            handle: body.handle,
            fire_at: body.fire_at,
        })
    }

    async fn poll(&self, handle: &str) -> Result<TimerStatus> {
        let url = format!("{}/timers/{}", self.config.scheduler_url, handle);
        let body: PollResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HoldfastError::timer(e.to_string()))?
            .json()
            .await
            .map_err(|e| HoldfastError::timer(e.to_string()))?;
        Ok(TimerStatus {
            fired: body.fired,
            fired_at: body.fired_at,
        })
    }

    async fn cancel(&self, handle: &str) -> Result<bool> {
        let url = format!("{}/timers/{}", self.config.scheduler_url, handle);
        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| HoldfastError::timer(e.to_string()))?;

        if !resp.status().is_success() {
            return Ok(false);
        }
        let body: CancelResponse = resp
            .json()
            .await
            .map_err(|e| HoldfastError::timer(e.to_string()))?;
        Ok(body.cancelled)
    }
}
