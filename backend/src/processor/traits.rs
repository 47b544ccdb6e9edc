use async_trait::async_trait;
use std::fmt::Debug;

use crate::processor::errors::ProcessorError;
use crate::processor::types::{BankAccount, BankAccountRequest, Payout, PayoutRequest};

/// The subset of a payment processor needed to pay out a redemption.
///
/// Bank transfers are modelled in two steps: register a destination bank
/// account, then create a payout to it.
#[async_trait]
pub(crate) trait PaymentProcessor: Send + Sync + Debug {
    /// Register a destination bank account under the merchant account
    async fn create_bank_account(
        &self,
        request: &BankAccountRequest,
    ) -> Result<BankAccount, ProcessorError>;

    /// Issue a transfer to a previously registered bank account
    async fn create_payout(&self, request: &PayoutRequest) -> Result<Payout, ProcessorError>;

    /// Remove a registered bank account
    async fn delete_bank_account(&self, bank_account_id: &str) -> Result<(), ProcessorError>;
}
