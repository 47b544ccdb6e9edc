use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::redemptions::errors::PayoutError;
use crate::redemptions::orchestrator::{PayoutOrchestrator, PayoutOutcome};
use crate::redemptions::types::RedemptionStatus;

/// Body of `POST /api/process-payout`
#[derive(Debug, Deserialize)]
struct ProcessPayoutBody {
    #[serde(default)]
    redemption_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PayoutResponse {
    success: bool,
    payout_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    status: RedemptionStatus,
    message: &'static str,
}

impl From<PayoutOutcome> for PayoutResponse {
    fn from(outcome: PayoutOutcome) -> Self {
        Self {
            success: true,
            payout_id: outcome.payout_id,
            amount: outcome.amount_euro,
            status: RedemptionStatus::Paid,
            message: "Transferência processada com sucesso",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for PayoutError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            Self::MissingRedemptionId => {
                (StatusCode::BAD_REQUEST, "redemption_id é obrigatório", None)
            }
            Self::MissingIban(_) => (StatusCode::BAD_REQUEST, "IBAN não fornecido", None),
            Self::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "Montante inválido", None),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "Resgate não encontrado", None),
            Self::Conflict(_) => (StatusCode::BAD_REQUEST, "Resgate já foi processado", None),
            Self::BankAccountRegistration(e) => (
                StatusCode::BAD_REQUEST,
                "IBAN inválido ou erro ao criar conta bancária",
                Some(e.to_string()),
            ),
            Self::PayoutCreation(e) => (
                StatusCode::BAD_REQUEST,
                "Erro ao processar pagamento",
                Some(e.to_string()),
            ),
            Self::Store(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erro interno do servidor",
                Some(e.to_string()),
            ),
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

/// Routes for the payout trigger
pub(crate) fn payout_routes(orchestrator: Arc<PayoutOrchestrator>) -> Router {
    Router::new().route(
        "/api/process-payout",
        post(move |body: Bytes| process_payout(Arc::clone(&orchestrator), body))
            .options(preflight)
            .fallback(method_not_allowed),
    )
}

/// HTTP handler for POST `/api/process-payout`
pub(crate) async fn process_payout(orchestrator: Arc<PayoutOrchestrator>, body: Bytes) -> Response {
    // A body that is not JSON is treated as a request without an id.
    let redemption_id = serde_json::from_slice::<ProcessPayoutBody>(&body)
        .ok()
        .and_then(|body| body.redemption_id)
        .unwrap_or_default();

    match orchestrator.process(&redemption_id).await {
        Ok(outcome) => {
            if !outcome.record_synced {
                warn!(redemption_id = %outcome.redemption_id, payout_id = %outcome.payout_id, "Payout succeeded with unsynced record");
            }
            info!(
                redemption_id = %outcome.redemption_id,
                payout_id = %outcome.payout_id,
                amount_cents = outcome.amount_cents,
                "Payout processed"
            );
            (StatusCode::OK, Json(PayoutResponse::from(outcome))).into_response()
        }
        Err(err) => {
            warn!(%redemption_id, error = %err, "Payout request failed");
            err.into_response()
        }
    }
}

async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                "Content-Type, Authorization, X-Requested-With",
            ),
        ],
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Method not allowed" })),
    )
}
