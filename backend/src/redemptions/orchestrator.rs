use chrono::Utc;
use rust_decimal::Decimal;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{error, info, warn};

use crate::processor::errors::ProcessorError;
use crate::processor::traits::PaymentProcessor;
use crate::processor::types::{BankAccountRequest, Payout, PayoutRequest};
use crate::redemptions::errors::{PayoutError, StoreError};
use crate::redemptions::traits::RecordStore;
use crate::redemptions::types::{mask_iban, to_minor_units, Redemption, RedemptionStatus};
use crate::utils::with_timeout;

/// Result of a payout run that moved money
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PayoutOutcome {
    pub(crate) redemption_id: String,
    pub(crate) payout_id: String,
    pub(crate) amount_euro: Decimal,
    pub(crate) amount_cents: i64,
    /// `false` when the transfer went out but the `paid` status could not be
    /// written. The transfer is not reversed.
    pub(crate) record_synced: bool,
}

/// How far a run got before a step failed; decides what has to be unwound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PayoutStage {
    /// Redemption claimed, nothing exists at the processor yet
    Claimed,
    /// A bank account handle exists at the processor
    BankAccountRegistered { bank_account_id: String },
}

/// Drives one redemption through bank account registration and payout,
/// leaving it `paid` or `rejected`.
#[derive(Debug, Clone)]
pub(crate) struct PayoutOrchestrator {
    store: Arc<dyn RecordStore>,
    processor: Arc<dyn PaymentProcessor>,
    statement_descriptor: String,
    step_timeout: Duration,
}

impl PayoutOrchestrator {
    pub(crate) fn new(
        store: Arc<dyn RecordStore>,
        processor: Arc<dyn PaymentProcessor>,
        statement_descriptor: impl Into<String>,
        step_timeout: Duration,
    ) -> Self {
        Self {
            store,
            processor,
            statement_descriptor: statement_descriptor.into(),
            step_timeout,
        }
    }

    /// Pay out a pending redemption.
    ///
    /// Validation, not-found and conflict errors leave the record store
    /// untouched. Processor failures reject the redemption and refund its
    /// points before returning, or hand it back to `pending` when that write
    /// fails.
    pub(crate) async fn process(&self, redemption_id: &str) -> Result<PayoutOutcome, PayoutError> {
        let redemption_id = redemption_id.trim();
        if redemption_id.is_empty() {
            return Err(PayoutError::MissingRedemptionId);
        }

        let redemption = self
            .store_call(self.store.fetch_redemption(redemption_id))
            .await?
            .ok_or_else(|| PayoutError::NotFound(redemption_id.to_string()))?;

        if redemption.status != RedemptionStatus::Pending {
            warn!(
                %redemption_id,
                status = %redemption.status,
                processed_at = ?redemption.processed_at,
                admin_notes = ?redemption.admin_notes,
                "Redemption already processed"
            );
            return Err(PayoutError::Conflict(redemption_id.to_string()));
        }

        let bank_request = bank_account_request(&redemption)?;
        let amount_cents = to_minor_units(redemption.amount_euro)
            .filter(|cents| *cents > 0)
            .ok_or_else(|| PayoutError::InvalidAmount(redemption_id.to_string()))?;

        if !self.store_call(self.store.claim_pending(redemption_id)).await? {
            warn!(%redemption_id, "Redemption claimed by another run");
            return Err(PayoutError::Conflict(redemption_id.to_string()));
        }

        info!(
            %redemption_id,
            user_id = %redemption.user.id,
            user_email = %redemption.user.email,
            user_points = redemption.user.points,
            amount_euro = %redemption.amount_euro,
            amount_cents,
            iban = %mask_iban(&bank_request.account_number),
            requested_at = %redemption.requested_at,
            "Processing payout"
        );

        // Step 1: register the destination bank account
        let bank_account = match self
            .processor_call(self.processor.create_bank_account(&bank_request))
            .await
        {
            Ok(account) => account,
            Err(e) => {
                error!(%redemption_id, error = %e, status = ?e.status_code(), "Bank account registration failed");
                self.unwind(
                    redemption_id,
                    &PayoutStage::Claimed,
                    &format!("Erro ao criar conta bancária: {e}"),
                    &format!("IBAN inválido: {e}"),
                )
                .await;
                return Err(PayoutError::BankAccountRegistration(e));
            }
        };
        info!(%redemption_id, bank_account_id = %bank_account.id, last4 = ?bank_account.last4, "Bank account registered");

        // Step 2: issue the transfer
        let payout_request = self.payout_request(&redemption, amount_cents, &bank_account.id);
        let payout = match self
            .processor_call(self.processor.create_payout(&payout_request))
            .await
        {
            Ok(payout) => payout,
            Err(e) => {
                error!(%redemption_id, error = %e, status = ?e.status_code(), "Payout creation failed");
                let note = format!("Erro ao processar pagamento: {e}");
                self.unwind(
                    redemption_id,
                    &PayoutStage::BankAccountRegistered {
                        bank_account_id: bank_account.id.clone(),
                    },
                    &note,
                    &note,
                )
                .await;
                return Err(PayoutError::PayoutCreation(e));
            }
        };
        info!(%redemption_id, payout_id = %payout.id, "Payout created");

        // Step 3: bookkeeping, then cleanup. Money has moved; nothing below
        // may fail the run.
        let record_synced = self.record_paid(redemption_id, &payout).await;
        self.release_bank_account(&bank_account.id).await;

        Ok(PayoutOutcome {
            redemption_id: redemption_id.to_string(),
            payout_id: payout.id,
            amount_euro: redemption.amount_euro,
            amount_cents,
            record_synced,
        })
    }

    fn payout_request(
        &self,
        redemption: &Redemption,
        amount_cents: i64,
        bank_account_id: &str,
    ) -> PayoutRequest {
        let user_name = redemption.user.name.as_deref().unwrap_or_default();
        PayoutRequest {
            amount_cents,
            destination: bank_account_id.to_string(),
            description: format!(
                "Resgate de {} pontos - {}",
                redemption.points_redeemed, user_name
            ),
            statement_descriptor: self.statement_descriptor.clone(),
            metadata: vec![
                ("redemption_id".to_string(), redemption.id.clone()),
                ("user_id".to_string(), redemption.user.id.clone()),
                ("points".to_string(), redemption.points_redeemed.to_string()),
            ],
        }
    }

    /// Undo a failed run according to how far it got: drop the bank account
    /// handle if one exists, then reject the redemption and refund its
    /// points.
    pub(crate) async fn unwind(
        &self,
        redemption_id: &str,
        stage: &PayoutStage,
        note: &str,
        refund_reason: &str,
    ) {
        if let PayoutStage::BankAccountRegistered { bank_account_id } = stage {
            self.release_bank_account(bank_account_id).await;
        }
        self.reject_and_refund(redemption_id, note, refund_reason)
            .await;
    }

    /// Best-effort deletion of a transient bank account handle.
    ///
    /// Returns whether the handle is known to be gone.
    pub(crate) async fn release_bank_account(&self, bank_account_id: &str) -> bool {
        match self
            .processor_call(self.processor.delete_bank_account(bank_account_id))
            .await
        {
            Ok(()) => {
                info!(%bank_account_id, "Bank account removed");
                true
            }
            Err(e) => {
                warn!(%bank_account_id, error = %e, "Failed to remove bank account (non-critical)");
                false
            }
        }
    }

    /// Mark the redemption rejected and credit its points back in one store
    /// write.
    ///
    /// When that write fails the claim is released so the redemption can be
    /// retried. Returns whether the redemption ended up rejected.
    pub(crate) async fn reject_and_refund(
        &self,
        redemption_id: &str,
        note: &str,
        refund_reason: &str,
    ) -> bool {
        match self
            .store_call(
                self.store
                    .reject_and_refund(redemption_id, note, refund_reason, Utc::now()),
            )
            .await
        {
            Ok(true) => {
                info!(%redemption_id, "Redemption rejected and points refunded");
                true
            }
            Ok(false) => {
                warn!(%redemption_id, "Redemption rejected; points were already refunded");
                true
            }
            Err(e) => {
                error!(%redemption_id, error = %e, "Failed to reject redemption and refund points");
                self.release_claim(redemption_id).await;
                false
            }
        }
    }

    /// Put a claimed redemption back to `pending` after a failed rejection.
    async fn release_claim(&self, redemption_id: &str) -> bool {
        match self
            .store_call(self.store.release_claim(redemption_id))
            .await
        {
            Ok(released) => {
                if released {
                    warn!(%redemption_id, "Claim released; redemption is pending again");
                }
                released
            }
            Err(e) => {
                error!(%redemption_id, error = %e, "Redemption left claimed, needs manual review");
                false
            }
        }
    }

    /// Persist the `paid` status after a transfer. Failures are logged only.
    async fn record_paid(&self, redemption_id: &str, payout: &Payout) -> bool {
        let note = format!("Payout automático: {}", payout.id);
        match self
            .store_call(self.store.mark_paid(redemption_id, payout, &note, Utc::now()))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(
                    %redemption_id,
                    payout_id = %payout.id,
                    error = %e,
                    "Payout issued but redemption status could not be updated"
                );
                false
            }
        }
    }

    async fn store_call<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        with_timeout(self.step_timeout, operation, || StoreError::Timeout).await
    }

    async fn processor_call<T>(
        &self,
        operation: impl Future<Output = Result<T, ProcessorError>>,
    ) -> Result<T, ProcessorError> {
        with_timeout(self.step_timeout, operation, || ProcessorError::Timeout).await
    }
}

/// Destination bank details for a redemption.
///
/// The holder name falls back to the user's display name.
fn bank_account_request(redemption: &Redemption) -> Result<BankAccountRequest, PayoutError> {
    let details = &redemption.payment_details;
    let account_number = details
        .iban()
        .ok_or_else(|| PayoutError::MissingIban(redemption.id.clone()))?;
    let account_holder_name = details
        .account_name()
        .or(redemption.user.name.as_deref())
        .unwrap_or_default();

    Ok(BankAccountRequest {
        account_holder_name: account_holder_name.to_string(),
        account_number: account_number.to_string(),
    })
}
