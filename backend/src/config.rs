use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use std::time::Duration;
use tracing::info;

/// Default processor REST endpoint
const DEFAULT_PROCESSOR_API_URL: &str = "https://api.stripe.com";

/// Default merchant account that owns the transient bank accounts
const DEFAULT_PROCESSOR_ACCOUNT_ID: &str = "acct_default";

/// Default statement descriptor shown on the receiving bank statement
const DEFAULT_STATEMENT_DESCRIPTOR: &str = "BETAI PONTOS";

/// Default timeout for a single external call, in seconds
const DEFAULT_STEP_TIMEOUT_S: u64 = 30;

/// Command line arguments for the payout service listener.
#[derive(Debug, Clone, Parser)]
#[command(name = "payouts-backend", about = "Redemption payout service")]
pub(crate) struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub(crate) port: u16,

    /// SQLite database URL for the record store
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://payouts.db?mode=rwc")]
    pub(crate) database_url: String,
}

/// Payment processor and orchestration settings
#[derive(Debug, Clone)]
pub(crate) struct PayoutConfig {
    /// Base URL of the processor REST API
    processor_api_url: String,

    /// Secret API key sent as a bearer token
    secret_key: String,

    /// Merchant account under which bank accounts are registered
    processor_account_id: String,

    /// Statement descriptor attached to every payout
    statement_descriptor: String,

    /// Timeout applied to each external call
    step_timeout_s: u64,
}

impl PayoutConfig {
    pub(crate) fn new() -> Result<Self> {
        dotenv().ok(); // Load `.env` file if present

        let processor_api_url = std::env::var("PROCESSOR_API_URL")
            .ok()
            .unwrap_or_else(|| DEFAULT_PROCESSOR_API_URL.to_string());

        let secret_key =
            std::env::var("STRIPE_SECRET_KEY").context("STRIPE_SECRET_KEY must be set")?;

        let processor_account_id = std::env::var("PROCESSOR_ACCOUNT_ID")
            .ok()
            .unwrap_or_else(|| DEFAULT_PROCESSOR_ACCOUNT_ID.to_string());

        let statement_descriptor = std::env::var("PAYOUT_STATEMENT_DESCRIPTOR")
            .ok()
            .unwrap_or_else(|| DEFAULT_STATEMENT_DESCRIPTOR.to_string());

        let step_timeout_s: u64 = std::env::var("PAYOUT_STEP_TIMEOUT_S")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_STEP_TIMEOUT_S);

        info!(
            %processor_api_url,
            %processor_account_id,
            step_timeout_s,
            "Loaded payout config:"
        );

        Ok(Self {
            processor_api_url,
            secret_key,
            processor_account_id,
            statement_descriptor,
            step_timeout_s,
        })
    }

    /// Build a config without touching the environment.
    #[cfg(test)]
    pub(crate) fn for_tests(processor_api_url: &str) -> Self {
        Self {
            processor_api_url: processor_api_url.to_string(),
            secret_key: "sk_test_123".to_string(),
            processor_account_id: DEFAULT_PROCESSOR_ACCOUNT_ID.to_string(),
            statement_descriptor: DEFAULT_STATEMENT_DESCRIPTOR.to_string(),
            step_timeout_s: DEFAULT_STEP_TIMEOUT_S,
        }
    }

    /// Getter for `processor_api_url`
    pub(crate) fn processor_api_url(&self) -> &str {
        &self.processor_api_url
    }

    /// Getter for `secret_key`
    pub(crate) fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Getter for `processor_account_id`
    pub(crate) fn processor_account_id(&self) -> &str {
        &self.processor_account_id
    }

    /// Getter for `statement_descriptor`
    pub(crate) fn statement_descriptor(&self) -> &str {
        &self.statement_descriptor
    }

    /// Getter for `step_timeout_s`
    pub(crate) fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_s)
    }
}
