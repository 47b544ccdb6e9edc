use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::{convert::TryFrom, str::FromStr};

use crate::redemptions::errors::StoreError;
use crate::redemptions::types::{PaymentDetails, Redemption, RedemptionStatus, UserSummary};

/// Redemption joined with its owning user, as stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RedemptionRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) user_name: Option<String>,
    pub(crate) user_email: String,
    pub(crate) user_points: i64,
    pub(crate) points_redeemed: i64,

    /// Exact decimal string, e.g. `25.50`
    pub(crate) amount_euro: String,

    /// JSON object with `iban` and `accountName`
    pub(crate) payment_details: String,

    pub(crate) status: String,
    pub(crate) admin_notes: Option<String>,
    pub(crate) requested_at: DateTime<Utc>,
    pub(crate) processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RedemptionRow> for Redemption {
    type Error = StoreError;

    fn try_from(row: RedemptionRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| StoreError::InvalidRow {
            id: row.id.clone(),
            reason,
        };

        let amount_euro = Decimal::from_str(row.amount_euro.trim())
            .map_err(|e| invalid(format!("amount_euro '{}': {e}", row.amount_euro)))?;
        let payment_details: PaymentDetails = serde_json::from_str(&row.payment_details)
            .map_err(|e| invalid(format!("payment_details: {e}")))?;
        let status = RedemptionStatus::from_str(&row.status).map_err(invalid)?;

        Ok(Self {
            user: UserSummary {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
                points: row.user_points,
            },
            points_redeemed: row.points_redeemed,
            amount_euro,
            payment_details,
            status,
            admin_notes: row.admin_notes,
            requested_at: row.requested_at,
            processed_at: row.processed_at,
            id: row.id,
        })
    }
}
