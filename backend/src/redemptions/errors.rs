use thiserror::Error;

use crate::processor::ProcessorError;

/// Error types for record store operations
#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid redemption row {id}: {reason}")]
    InvalidRow { id: String, reason: String },

    /// The row was no longer in a state that allows the requested transition.
    #[error("redemption {0} is not awaiting processing")]
    StaleStatus(String),

    #[error("record store call timed out")]
    Timeout,
}

/// Errors returned by the payout orchestrator.
///
/// Validation, not-found and conflict errors are raised before any write.
/// Processor failures are raised after the redemption was rejected and its
/// points refunded.
#[derive(Debug, Error)]
pub(crate) enum PayoutError {
    #[error("redemption_id is required")]
    MissingRedemptionId,

    #[error("redemption {0} has no bank account number")]
    MissingIban(String),

    #[error("redemption {0} has an invalid amount")]
    InvalidAmount(String),

    #[error("redemption {0} not found")]
    NotFound(String),

    #[error("redemption {0} is not pending")]
    Conflict(String),

    #[error("bank account registration failed: {0}")]
    BankAccountRegistration(#[source] ProcessorError),

    #[error("payout creation failed: {0}")]
    PayoutCreation(#[source] ProcessorError),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),
}
