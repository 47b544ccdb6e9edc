//! Fakes and fixtures shared by the redemption tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::processor::errors::ProcessorError;
use crate::processor::traits::PaymentProcessor;
use crate::processor::types::{BankAccount, BankAccountRequest, Payout, PayoutRequest};
use crate::redemptions::db::run_migrations;
use crate::redemptions::errors::StoreError;
use crate::redemptions::traits::RecordStore;
use crate::redemptions::types::{
    PaymentDetails, Redemption, RedemptionStatus, UserSummary,
};

pub(crate) const TEST_IBAN: &str = "PT50000201231234567890154";

/// Single-connection in-memory database with migrations applied.
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

/// Insert user `u1` (1000 points) if needed and a redemption of 255 points.
pub(crate) async fn seed_redemption(pool: &SqlitePool, id: &str, status: &str, amount: &str) {
    sqlx::query("INSERT OR IGNORE INTO users (id, name, email, points) VALUES ('u1', 'Jane Doe', 'jane@example.com', 1000)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO redemptions (id, user_id, points_redeemed, amount_euro, payment_details, status) VALUES (?1, 'u1', 255, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(amount)
    .bind(format!(r#"{{"iban":"{TEST_IBAN}","accountName":"Jane Doe"}}"#))
    .bind(status)
    .execute(pool)
    .await
    .unwrap();
}

pub(crate) fn sqlite_payout(id: &str, amount: i64) -> Payout {
    Payout {
        id: id.to_string(),
        amount,
        currency: "eur".to_string(),
        status: Some("pending".to_string()),
    }
}

pub(crate) fn pending_redemption(id: &str, amount_euro: Decimal) -> Redemption {
    Redemption {
        id: id.to_string(),
        user: UserSummary {
            id: "u1".to_string(),
            name: Some("Jane Doe".to_string()),
            email: "jane@example.com".to_string(),
            points: 1000,
        },
        points_redeemed: 255,
        amount_euro,
        payment_details: PaymentDetails {
            iban: Some(TEST_IBAN.to_string()),
            account_name: Some("Jane Doe".to_string()),
        },
        status: RedemptionStatus::Pending,
        admin_notes: None,
        requested_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        processed_at: None,
    }
}

#[derive(Debug, Default)]
struct StoreState {
    redemptions: HashMap<String, Redemption>,
    payouts: Vec<(String, Payout)>,
    refunds: Vec<(String, String)>,
    writes: usize,
}

/// Record store kept in memory, with switches for failing individual calls.
#[derive(Debug, Default)]
pub(crate) struct InMemoryRecordStore {
    state: Mutex<StoreState>,
    fail_fetch: bool,
    fail_mark_paid: bool,
    fail_reject: bool,
    fail_release: bool,
}

impl InMemoryRecordStore {
    pub(crate) fn with(redemptions: impl IntoIterator<Item = Redemption>) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for redemption in redemptions {
                state.redemptions.insert(redemption.id.clone(), redemption);
            }
        }
        store
    }

    pub(crate) fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub(crate) fn failing_mark_paid(mut self) -> Self {
        self.fail_mark_paid = true;
        self
    }

    pub(crate) fn failing_reject(mut self) -> Self {
        self.fail_reject = true;
        self
    }

    pub(crate) fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub(crate) fn redemption(&self, id: &str) -> Redemption {
        self.state.lock().unwrap().redemptions[id].clone()
    }

    pub(crate) fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub(crate) fn payouts(&self) -> Vec<(String, Payout)> {
        self.state.lock().unwrap().payouts.clone()
    }

    pub(crate) fn refunds(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().refunds.clone()
    }

    fn transition(
        &self,
        redemption_id: &str,
        status: RedemptionStatus,
        note: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        let redemption = state
            .redemptions
            .get_mut(redemption_id)
            .filter(|r| matches!(r.status, RedemptionStatus::Pending | RedemptionStatus::Approved))
            .ok_or_else(|| StoreError::StaleStatus(redemption_id.to_string()))?;
        redemption.status = status;
        redemption.admin_notes = Some(note.to_string());
        redemption.processed_at = Some(processed_at);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_redemption(
        &self,
        redemption_id: &str,
    ) -> Result<Option<Redemption>, StoreError> {
        if self.fail_fetch {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.state.lock().unwrap().redemptions.get(redemption_id).cloned())
    }

    async fn claim_pending(&self, redemption_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        match state.redemptions.get_mut(redemption_id) {
            Some(r) if r.status == RedemptionStatus::Pending => {
                r.status = RedemptionStatus::Approved;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_paid(
        &self,
        redemption_id: &str,
        payout: &Payout,
        note: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.fail_mark_paid {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.transition(redemption_id, RedemptionStatus::Paid, note, processed_at)?;
        self.state
            .lock()
            .unwrap()
            .payouts
            .push((redemption_id.to_string(), payout.clone()));
        Ok(())
    }

    async fn reject_and_refund(
        &self,
        redemption_id: &str,
        note: &str,
        refund_reason: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if self.fail_reject {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.transition(redemption_id, RedemptionStatus::Rejected, note, processed_at)?;

        let mut state = self.state.lock().unwrap();
        if state.refunds.iter().any(|(id, _)| id == redemption_id) {
            return Ok(false);
        }
        state
            .refunds
            .push((redemption_id.to_string(), refund_reason.to_string()));
        Ok(true)
    }

    async fn release_claim(&self, redemption_id: &str) -> Result<bool, StoreError> {
        if self.fail_release {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        match state.redemptions.get_mut(redemption_id) {
            Some(r) if r.status == RedemptionStatus::Approved => {
                r.status = RedemptionStatus::Pending;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// A processor call as seen by [`ScriptedProcessor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProcessorCall {
    CreateBankAccount(BankAccountRequest),
    CreatePayout(PayoutRequest),
    DeleteBankAccount(String),
}

#[derive(Debug, Default)]
struct ProcessorState {
    calls: Vec<ProcessorCall>,
    live_bank_accounts: HashSet<String>,
    bank_accounts_created: usize,
    payouts_created: usize,
}

/// Payment processor fake that answers from a script and records every call.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProcessor {
    state: Mutex<ProcessorState>,
    bank_account_error: Option<String>,
    payout_error: Option<String>,
    delete_error: Option<String>,
    hang_on_payout: bool,
}

impl ScriptedProcessor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_bank_account(mut self, message: &str) -> Self {
        self.bank_account_error = Some(message.to_string());
        self
    }

    pub(crate) fn failing_payout(mut self, message: &str) -> Self {
        self.payout_error = Some(message.to_string());
        self
    }

    pub(crate) fn failing_delete(mut self, message: &str) -> Self {
        self.delete_error = Some(message.to_string());
        self
    }

    pub(crate) fn hanging_payout(mut self) -> Self {
        self.hang_on_payout = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<ProcessorCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn live_bank_accounts(&self) -> HashSet<String> {
        self.state.lock().unwrap().live_bank_accounts.clone()
    }

    pub(crate) fn payout_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProcessorCall::CreatePayout(_)))
            .count()
    }

    fn api_error(message: &str) -> ProcessorError {
        ProcessorError::Api {
            status: 400,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedProcessor {
    async fn create_bank_account(
        &self,
        request: &BankAccountRequest,
    ) -> Result<BankAccount, ProcessorError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(ProcessorCall::CreateBankAccount(request.clone()));
        if let Some(message) = &self.bank_account_error {
            return Err(Self::api_error(message));
        }
        state.bank_accounts_created += 1;
        let id = format!("ba_{}", state.bank_accounts_created);
        state.live_bank_accounts.insert(id.clone());
        Ok(BankAccount {
            id,
            last4: Some("0154".to_string()),
        })
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<Payout, ProcessorError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(ProcessorCall::CreatePayout(request.clone()));
            if let Some(message) = &self.payout_error {
                return Err(Self::api_error(message));
            }
        }
        if self.hang_on_payout {
            std::future::pending::<()>().await;
        }
        let mut state = self.state.lock().unwrap();
        state.payouts_created += 1;
        Ok(Payout {
            id: format!("po_{}", state.payouts_created),
            amount: request.amount_cents,
            currency: "eur".to_string(),
            status: Some("pending".to_string()),
        })
    }

    async fn delete_bank_account(&self, bank_account_id: &str) -> Result<(), ProcessorError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(ProcessorCall::DeleteBankAccount(bank_account_id.to_string()));
        if let Some(message) = &self.delete_error {
            return Err(Self::api_error(message));
        }
        state.live_bank_accounts.remove(bank_account_id);
        Ok(())
    }
}
