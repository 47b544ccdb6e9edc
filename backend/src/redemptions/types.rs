use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle of a redemption.
///
/// `pending` is initial, `approved` marks a redemption claimed by a payout
/// run, `paid` and `rejected` are terminal.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RedemptionStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl RedemptionStatus {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedemptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "paid" => Ok(Self::Paid),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown redemption status '{other}'")),
        }
    }
}

/// Bank details the user supplied with the redemption request
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PaymentDetails {
    #[serde(default)]
    pub(crate) iban: Option<String>,
    #[serde(default, rename = "accountName")]
    pub(crate) account_name: Option<String>,
}

impl PaymentDetails {
    /// IBAN with surrounding whitespace removed, `None` when blank
    pub(crate) fn iban(&self) -> Option<&str> {
        non_blank(self.iban.as_deref())
    }

    pub(crate) fn account_name(&self) -> Option<&str> {
        non_blank(self.account_name.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Owning user joined onto a redemption
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct UserSummary {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    pub(crate) email: String,
    /// Point balance at fetch time
    pub(crate) points: i64,
}

/// A user's request to convert points into a euro payout
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Redemption {
    pub(crate) id: String,
    pub(crate) user: UserSummary,
    pub(crate) points_redeemed: i64,
    pub(crate) amount_euro: Decimal,
    pub(crate) payment_details: PaymentDetails,
    pub(crate) status: RedemptionStatus,
    pub(crate) admin_notes: Option<String>,
    pub(crate) requested_at: DateTime<Utc>,
    pub(crate) processed_at: Option<DateTime<Utc>>,
}

/// Convert a euro amount to cents, rounding half away from zero.
///
/// Returns `None` if the result does not fit in an `i64`.
pub(crate) fn to_minor_units(amount_euro: Decimal) -> Option<i64> {
    amount_euro
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Mask an account number for logs, keeping the country prefix and last four
/// characters.
pub(crate) fn mask_iban(iban: &str) -> String {
    let chars: Vec<char> = iban.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars.iter().take(4).collect();
    let tail: String = chars.iter().skip(chars.len() - 4).collect();
    format!("{head}****{tail}")
}
