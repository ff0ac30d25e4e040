//! Server configuration
//!
//! Everything comes from the environment (optionally via `.env`), with CLI
//! overrides applied in `main`. Secrets never reach the logs unmasked.

use std::net::SocketAddr;

use holdfast_chain::ChainConfig;
use holdfast_coordinator::CoordinatorConfig;
use holdfast_ledger::LedgerConfig;
use holdfast_timer::TimerConfig;

/// Placeholder token that must be replaced outside development
pub const DEFAULT_ADMIN_TOKEN: &str = "change-me-in-production";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Bearer token required on admin routes
    pub admin_token: String,
    /// Ledger store connection
    pub ledger: LedgerConfig,
    /// Chain relay client
    pub chain: ChainConfig,
    /// Timer scheduler client
    pub timer: TimerConfig,
    /// Coordinator tuning
    pub coordinator: CoordinatorConfig,
}

impl ServerConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOLDFAST_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("HOLDFAST_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            admin_token: std::env::var("HOLDFAST_ADMIN_TOKEN")
                .unwrap_or_else(|_| DEFAULT_ADMIN_TOKEN.to_string()),
            ledger: LedgerConfig::default(),
            chain: ChainConfig::from_env(),
            timer: TimerConfig::from_env(),
            coordinator: CoordinatorConfig::from_env(),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Reject configurations unsafe outside development
    pub fn validate(&self, dev_mode: bool) -> anyhow::Result<()> {
        if !dev_mode && self.admin_token == DEFAULT_ADMIN_TOKEN {
            anyhow::bail!(
                "Admin token must be changed in production. Set HOLDFAST_ADMIN_TOKEN."
            );
        }
        if self.admin_token.len() < 16 && !dev_mode {
            anyhow::bail!("Admin token must be at least 16 characters");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: &str) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            admin_token: token.to_string(),
            ledger: LedgerConfig::default(),
            chain: ChainConfig::default(),
            timer: TimerConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }

    #[test]
    fn test_default_token_rejected_in_prod() {
        let config = config_with_token(DEFAULT_ADMIN_TOKEN);
        assert!(config.validate(false).is_err());
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn test_short_token_rejected_in_prod() {
        let config = config_with_token("short");
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_strong_token_accepted() {
        let config = config_with_token("a-long-operator-secret-token");
        assert!(config.validate(false).is_ok());
    }
}
