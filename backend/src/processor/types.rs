use serde::Deserialize;

/// Transfers are always domestic Portuguese bank transfers.
pub(crate) const BANK_COUNTRY: &str = "PT";

/// Currency used for bank accounts and payouts.
pub(crate) const PAYOUT_CURRENCY: &str = "eur";

/// Destination bank details to register at the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BankAccountRequest {
    pub(crate) account_holder_name: String,
    pub(crate) account_number: String,
}

/// Processor-side handle for a registered bank account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct BankAccount {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) last4: Option<String>,
}

/// A transfer to issue to a registered bank account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PayoutRequest {
    /// Amount in cents
    pub(crate) amount_cents: i64,
    pub(crate) destination: String,
    pub(crate) description: String,
    pub(crate) statement_descriptor: String,
    pub(crate) metadata: Vec<(String, String)>,
}

/// Processor-issued receipt for a created transfer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Payout {
    pub(crate) id: String,
    /// Amount in cents
    pub(crate) amount: i64,
    pub(crate) currency: String,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

/// Error envelope returned by the processor on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub(crate) error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) message: String,
}
