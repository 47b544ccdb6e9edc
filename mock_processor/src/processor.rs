use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, post},
    Form, Json, Router,
};
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::info;

/// Bank account registered through the mock
#[derive(Debug, Clone)]
pub(crate) struct MockBankAccount {
    pub(crate) id: String,
    pub(crate) holder_name: String,
    pub(crate) last4: String,
}

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub(crate) bank_accounts: HashMap<String, MockBankAccount>,
    pub(crate) payouts: Vec<(String, i64)>,
    next_id: u64,
    /// Funds available for payouts, in cents
    balance_cents: i64,
}

impl MockState {
    pub(crate) fn with_balance(balance_cents: i64) -> Self {
        Self {
            balance_cents,
            ..Self::default()
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_mock_{}", self.next_id)
    }
}

pub(crate) type SharedMockState = Arc<RwLock<MockState>>;

/// Stripe-style error envelope
fn api_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "type": "invalid_request_error", "message": message } })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer ") && value.len() > "Bearer ".len())
}

/// Loose IBAN shape check: country letters, check digits, alphanumeric body.
fn looks_like_iban(value: &str) -> bool {
    let compact: Vec<char> = value.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 15
        && compact.len() <= 34
        && compact.iter().take(2).all(|c| c.is_ascii_uppercase())
        && compact.iter().skip(2).take(2).all(|c| c.is_ascii_digit())
        && compact.iter().all(|c| c.is_ascii_alphanumeric())
}

pub(crate) fn router(state: SharedMockState) -> Router {
    Router::new()
        .route(
            "/v1/accounts/:account/external_accounts",
            post(create_external_account),
        )
        .route(
            "/v1/accounts/:account/external_accounts/:id",
            delete(delete_external_account),
        )
        .route("/v1/payouts", post(create_payout))
        .with_state(state)
}

async fn create_external_account(
    State(state): State<SharedMockState>,
    Path(account): Path<String>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "You did not provide an API key.");
    }

    let account_number = params
        .get("external_account[account_number]")
        .map(String::as_str)
        .unwrap_or_default();
    if !looks_like_iban(account_number) {
        return api_error(
            StatusCode::BAD_REQUEST,
            "The account number you provided is not a valid IBAN.",
        );
    }

    let holder_name = params
        .get("external_account[account_holder_name]")
        .cloned()
        .unwrap_or_default();
    let last4: String = {
        let chars: Vec<char> = account_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        chars[chars.len() - 4..].iter().collect()
    };

    let mut locked = state.write().await;
    let id = locked.next_id("ba");
    locked.bank_accounts.insert(
        id.clone(),
        MockBankAccount {
            id: id.clone(),
            holder_name,
            last4: last4.clone(),
        },
    );
    info!(%account, bank_account_id = %id, "Registered external bank account");

    Json(json!({
        "id": id,
        "object": "bank_account",
        "account": account,
        "country": params.get("external_account[country]"),
        "currency": params.get("external_account[currency]"),
        "last4": last4,
    }))
    .into_response()
}

async fn delete_external_account(
    State(state): State<SharedMockState>,
    Path((account, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "You did not provide an API key.");
    }

    let mut locked = state.write().await;
    match locked.bank_accounts.remove(&id) {
        Some(removed) => {
            info!(%account, bank_account_id = %removed.id, holder = %removed.holder_name, "Deleted external bank account");
            Json(json!({ "id": id, "object": "bank_account", "deleted": true })).into_response()
        }
        None => api_error(
            StatusCode::NOT_FOUND,
            &format!("No such external account: '{id}'"),
        ),
    }
}

async fn create_payout(
    State(state): State<SharedMockState>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "You did not provide an API key.");
    }

    let Some(amount) = params.get("amount").and_then(|a| a.parse::<i64>().ok()) else {
        return api_error(StatusCode::BAD_REQUEST, "Invalid integer: amount");
    };
    if amount <= 0 {
        return api_error(StatusCode::BAD_REQUEST, "Amount must be at least 1 cent.");
    }

    let destination = params.get("destination").cloned().unwrap_or_default();
    let mut locked = state.write().await;
    let Some(bank_account) = locked.bank_accounts.get(&destination).cloned() else {
        return api_error(
            StatusCode::BAD_REQUEST,
            &format!("No such external account: '{destination}'"),
        );
    };
    if amount > locked.balance_cents {
        return api_error(
            StatusCode::BAD_REQUEST,
            "You have insufficient funds in your Stripe account.",
        );
    }

    locked.balance_cents -= amount;
    let id = locked.next_id("po");
    locked.payouts.push((id.clone(), amount));
    info!(payout_id = %id, amount, last4 = %bank_account.last4, "Created payout");

    let metadata: HashMap<&str, &str> = params
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix("metadata[")
                .and_then(|k| k.strip_suffix(']'))
                .map(|k| (k, value.as_str()))
        })
        .collect();

    Json(json!({
        "id": id,
        "object": "payout",
        "amount": amount,
        "currency": params.get("currency").map(String::as_str).unwrap_or("eur"),
        "destination": destination,
        "description": params.get("description"),
        "statement_descriptor": params.get("statement_descriptor"),
        "metadata": metadata,
        "status": "pending",
    }))
    .into_response()
}
