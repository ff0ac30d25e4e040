//! HTTP signing-relay gateway
//!
//! The relay holds the operator key and submits contract calls; this client
//! asks it to act, then polls the submitted job until the chain confirms or
//! the bounded wait expires. A job that reports `reverted` is surfaced as a
//! chain failure; a wait that exceeds the bound is surfaced as a timeout and
//! must be treated exactly like a failure by callers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use holdfast_types::{HoldfastError, Result, WalletAddress};

use crate::gateway::{ChainConfig, ChainGateway, EscrowDeposit};

/// Relay-backed [`ChainGateway`]
pub struct RelayChainGateway {
    client: Client,
    config: ChainConfig,
}

#[derive(Debug, Serialize)]
struct SubmitRequest {
    registration: i64,
    chain_id: i64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    status: String,
    tx_hash: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DepositResponse {
    registration: i64,
    depositor: String,
    value: String,
}

impl RelayChainGateway {
    pub fn new(config: ChainConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HoldfastError::internal(format!("http client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Submit a contract action and wait for confirmation.
    async fn submit_and_confirm(
        &self,
        action: &'static str,
        registration: i64,
        chain_id: i64,
    ) -> Result<String> {
        let url = format!(
            "{}/escrow/{}/{}",
            self.config.relay_url, registration, action
        );
        let resp = self
            .client
            .post(&url)
            .json(&SubmitRequest {
                registration,
                chain_id,
            })
            .send()
            .await
            .map_err(|e| chain_err(action, registration, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(chain_err(
                action,
                registration,
                format!("relay returned {}: {}", status, body),
            ));
        }

        let submitted: SubmitResponse = resp
            .json()
            .await
            .map_err(|e| chain_err(action, registration, e.to_string()))?;

        debug!(job_id = %submitted.job_id, action, registration, "chain call submitted");

        let wait = self.wait_for_confirmation(action, registration, &submitted.job_id);
        match tokio::time::timeout(self.config.confirm_timeout(), wait).await {
            Ok(result) => result,
            Err(_) => Err(HoldfastError::ChainTimeout {
                action,
                registration,
                waited_secs: self.config.confirm_timeout_secs,
            }),
        }
    }

    async fn wait_for_confirmation(
        &self,
        action: &'static str,
        registration: i64,
        job_id: &str,
    ) -> Result<String> {
        let url = format!("{}/jobs/{}", self.config.relay_url, job_id);
        loop {
            let job: JobStatus = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| chain_err(action, registration, e.to_string()))?
                .json()
                .await
                .map_err(|e| chain_err(action, registration, e.to_string()))?;

            match job.status.as_str() {
                "confirmed" => {
                    return job.tx_hash.ok_or_else(|| {
                        chain_err(action, registration, "confirmed without tx hash".to_string())
                    })
                }
                "reverted" | "failed" => {
                    return Err(chain_err(
                        action,
                        registration,
                        job.error.unwrap_or_else(|| "reverted".to_string()),
                    ))
                }
                _ => tokio::time::sleep(self.config.poll_interval()).await,
            }
        }
    }
}

fn chain_err(action: &'static str, registration: i64, message: String) -> HoldfastError {
    HoldfastError::ChainCall {
        action,
        registration,
        message,
    }
}

#[async_trait]
impl ChainGateway for RelayChainGateway {
    async fn deposit(&self, registration: i64, chain_id: i64) -> Result<Option<EscrowDeposit>> {
        let url = format!(
            "{}/escrow/{}?chain_id={}",
            self.config.relay_url, registration, chain_id
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| chain_err("deposit", registration, e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(chain_err(
                "deposit",
                registration,
                format!("relay returned {}", status),
            ));
        }

        let body: DepositResponse = resp
            .json()
            .await
            .map_err(|e| chain_err("deposit", registration, e.to_string()))?;
        let value = body
            .value
            .parse::<u128>()
            .map_err(|e| chain_err("deposit", registration, format!("bad value: {}", e)))?;
        Ok(Some(EscrowDeposit {
            registration: body.registration,
            depositor: WalletAddress::new(body.depositor),
            value,
        }))
    }

    async fn release(&self, registration: i64, chain_id: i64) -> Result<String> {
        self.submit_and_confirm("release", registration, chain_id).await
    }

    async fn refund(&self, registration: i64, chain_id: i64) -> Result<String> {
        self.submit_and_confirm("refund", registration, chain_id).await
    }
}
