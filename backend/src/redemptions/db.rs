use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::time::Duration;

use crate::processor::types::Payout;
use crate::redemptions::errors::StoreError;
use crate::redemptions::models::RedemptionRow;
use crate::redemptions::traits::RecordStore;
use crate::redemptions::types::Redemption;

/// Initialize the SQLite connection pool.
pub(crate) async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Runs all necessary migrations for the record store.
pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Record store backed by SQLite
#[derive(Debug, Clone)]
pub(crate) struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn fetch_redemption(
        &self,
        redemption_id: &str,
    ) -> Result<Option<Redemption>, StoreError> {
        let row = sqlx::query_as::<_, RedemptionRow>(
            r#"
            SELECT
                r.id,
                r.user_id,
                u.name AS user_name,
                u.email AS user_email,
                u.points AS user_points,
                r.points_redeemed,
                r.amount_euro,
                r.payment_details,
                r.status,
                r.admin_notes,
                r.requested_at,
                r.processed_at
            FROM redemptions r
            JOIN users u ON u.id = r.user_id
            WHERE r.id = ?1
            "#,
        )
        .bind(redemption_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Redemption::try_from).transpose()
    }

    async fn claim_pending(&self, redemption_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE redemptions
            SET status = 'approved'
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(redemption_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_paid(
        &self,
        redemption_id: &str,
        payout: &Payout,
        note: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE redemptions
            SET status = 'paid', admin_notes = ?2, payout_id = ?3, processed_at = ?4
            WHERE id = ?1 AND status IN ('pending', 'approved')
            "#,
        )
        .bind(redemption_id)
        .bind(note)
        .bind(&payout.id)
        .bind(processed_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Err(StoreError::StaleStatus(redemption_id.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO payouts (id, redemption_id, amount_cents, currency, processor_status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payout.id)
        .bind(redemption_id)
        .bind(payout.amount)
        .bind(&payout.currency)
        .bind(payout.status.as_deref())
        .bind(processed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reject_and_refund(
        &self,
        redemption_id: &str,
        note: &str,
        refund_reason: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE redemptions
            SET status = 'rejected', admin_notes = ?2, processed_at = ?3
            WHERE id = ?1 AND status IN ('pending', 'approved')
            "#,
        )
        .bind(redemption_id)
        .bind(note)
        .bind(processed_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Err(StoreError::StaleStatus(redemption_id.to_string()));
        }

        // Stamping first makes a second refund of the same redemption a no-op.
        let stamped = sqlx::query(
            r#"
            UPDATE redemptions
            SET points_refunded_at = ?2
            WHERE id = ?1 AND points_refunded_at IS NULL
            "#,
        )
        .bind(redemption_id)
        .bind(processed_at)
        .execute(&mut *tx)
        .await?;

        if stamped.rows_affected() != 1 {
            tx.commit().await?;
            return Ok(false);
        }

        let (user_id, points): (String, i64) =
            sqlx::query_as("SELECT user_id, points_redeemed FROM redemptions WHERE id = ?1")
                .bind(redemption_id)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("UPDATE users SET points = points + ?2 WHERE id = ?1")
            .bind(&user_id)
            .bind(points)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO point_transactions (user_id, points, reason, redemption_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user_id)
        .bind(points)
        .bind(refund_reason)
        .bind(redemption_id)
        .bind(processed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn release_claim(&self, redemption_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE redemptions
            SET status = 'pending'
            WHERE id = ?1 AND status = 'approved'
            "#,
        )
        .bind(redemption_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
