use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::processor::types::Payout;
use crate::redemptions::errors::StoreError;
use crate::redemptions::types::Redemption;

/// Persistence for redemptions and the point ledger
#[async_trait]
pub(crate) trait RecordStore: Send + Sync + Debug {
    /// Fetch a redemption joined with its owning user
    async fn fetch_redemption(&self, redemption_id: &str)
        -> Result<Option<Redemption>, StoreError>;

    /// Atomically move a redemption from `pending` to `approved`.
    ///
    /// Returns `false` when the redemption was not pending, which means
    /// another run already claimed it.
    async fn claim_pending(&self, redemption_id: &str) -> Result<bool, StoreError>;

    /// Record a completed transfer and move the redemption to `paid`
    async fn mark_paid(
        &self,
        redemption_id: &str,
        payout: &Payout,
        note: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Move the redemption to `rejected` and credit its redeemed points back
    /// to the user, in one transaction.
    ///
    /// The refund is applied at most once per redemption; returns whether
    /// points moved.
    async fn reject_and_refund(
        &self,
        redemption_id: &str,
        note: &str,
        refund_reason: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Hand a claimed redemption back to `pending` so a later run can retry it.
    ///
    /// Returns `false` when the redemption was no longer claimed.
    async fn release_claim(&self, redemption_id: &str) -> Result<bool, StoreError>;
}
