use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{de::DeserializeOwned, Deserialize};
use std::fmt;
use tracing::debug;

use crate::config::PayoutConfig;
use crate::processor::errors::ProcessorError;
use crate::processor::traits::PaymentProcessor;
use crate::processor::types::{
    BankAccount, BankAccountRequest, ErrorEnvelope, Payout, PayoutRequest, BANK_COUNTRY,
    PAYOUT_CURRENCY,
};

/// Payment processor client for the Stripe REST API.
///
/// Requests are form-encoded and authenticated with the secret key as a
/// bearer token. Bank accounts are registered as external accounts of a
/// single merchant account.
#[derive(Clone)]
pub(crate) struct StripeProcessor {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    account_id: String,
}

impl fmt::Debug for StripeProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeProcessor")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// Response to deleting an external account
#[derive(Debug, Deserialize)]
struct DeletedObject {
    id: String,
    deleted: bool,
}

impl StripeProcessor {
    pub(crate) fn new(http: reqwest::Client, config: &PayoutConfig) -> Self {
        Self {
            http,
            base_url: config.processor_api_url().trim_end_matches('/').to_string(),
            secret_key: config.secret_key().to_string(),
            account_id: config.processor_account_id().to_string(),
        }
    }

    fn external_accounts_url(&self) -> String {
        format!(
            "{}/v1/accounts/{}/external_accounts",
            self.base_url, self.account_id
        )
    }

    /// Send an authenticated request and decode the JSON response, turning
    /// error envelopes into [`ProcessorError::Api`].
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProcessorError> {
        let response = request.bearer_auth(&self.secret_key).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP error {status}"));
            return Err(ProcessorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_bank_account(
        &self,
        request: &BankAccountRequest,
    ) -> Result<BankAccount, ProcessorError> {
        let params = [
            ("external_account[object]", "bank_account"),
            ("external_account[country]", BANK_COUNTRY),
            ("external_account[currency]", PAYOUT_CURRENCY),
            (
                "external_account[account_holder_name]",
                request.account_holder_name.as_str(),
            ),
            (
                "external_account[account_number]",
                request.account_number.as_str(),
            ),
        ];

        let builder = self.http.post(self.external_accounts_url()).form(&params);
        self.send(builder).await
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<Payout, ProcessorError> {
        let mut params: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount_cents.to_string()),
            ("currency".to_string(), PAYOUT_CURRENCY.to_string()),
            ("destination".to_string(), request.destination.clone()),
            ("description".to_string(), request.description.clone()),
            (
                "statement_descriptor".to_string(),
                request.statement_descriptor.clone(),
            ),
        ];
        params.extend(
            request
                .metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
        );

        let builder = self
            .http
            .post(format!("{}/v1/payouts", self.base_url))
            .form(&params);
        self.send(builder).await
    }

    async fn delete_bank_account(&self, bank_account_id: &str) -> Result<(), ProcessorError> {
        let builder = self
            .http
            .delete(format!("{}/{}", self.external_accounts_url(), bank_account_id));
        let deleted: DeletedObject = self.send(builder).await?;

        if !deleted.deleted {
            return Err(ProcessorError::Api {
                status: 200,
                message: format!("bank account {} was not deleted", deleted.id),
            });
        }

        debug!(bank_account_id = %deleted.id, "External bank account deleted");
        Ok(())
    }
}
