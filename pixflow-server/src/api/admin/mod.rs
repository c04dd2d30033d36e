//! Admin API handlers.
//!
//! These endpoints replace ad-hoc reprocessing scripts and require the
//! `Pixflow-Admin-Authorization` header with the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `GET  /transactions`                          – list transactions (paginated, filterable)
//! - `POST /transactions`                          – register a pending transaction
//! - `GET  /transactions/{external_id}`            – transaction, deposit record and debug trail
//! - `POST /transactions/{external_id}/reprocess`  – poll the gateway, then reconcile
//! - `POST /transactions/{external_id}/reconcile`  – reconcile with an operator-supplied status
//! - `GET  /transactions/{external_id}/logs`       – debug trail only

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::state::AppState;

mod get_transaction;
mod list_debug_logs;
mod list_transactions;
mod reconcile;
mod register_transaction;
mod reprocess;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions::list_transactions)
                .post(register_transaction::register_transaction),
        )
        .route(
            "/transactions/{external_id}",
            get(get_transaction::get_transaction),
        )
        .route(
            "/transactions/{external_id}/reprocess",
            post(reprocess::reprocess),
        )
        .route(
            "/transactions/{external_id}/reconcile",
            post(reconcile::reconcile),
        )
        .route(
            "/transactions/{external_id}/logs",
            get(list_debug_logs::list_debug_logs),
        )
}

/// Upper bound on debug log entries returned for one transaction.
const DEBUG_LOG_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Database(sqlx::Error),
    NotFound,
    Conflict(String),
    Validation(String),
    Reconcile(ReconcileError),
    Gateway(GatewayError),
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Database(e) => {
                tracing::error!(error = %e, "Admin API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AdminApiError::NotFound => {
                (StatusCode::NOT_FOUND, "resource not found").into_response()
            }
            AdminApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            AdminApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AdminApiError::Reconcile(e) => {
                let status = match &e {
                    ReconcileError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
                    ReconcileError::InsufficientBalance { .. } => StatusCode::CONFLICT,
                    ReconcileError::Store(_) => {
                        tracing::error!(error = %e, "Admin API reconciliation error");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string()).into_response()
            }
            AdminApiError::Gateway(e) => {
                let status = match &e {
                    GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
                    e if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string()).into_response()
            }
        }
    }
}

impl From<ReprocessError> for AdminApiError {
    fn from(err: ReprocessError) -> Self {
        match err {
            ReprocessError::Gateway(e) => AdminApiError::Gateway(e),
            ReprocessError::Reconcile(e) => AdminApiError::Reconcile(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

use pixflow_core::entities::debug_log::DebugLogRecord;
use pixflow_core::entities::deposit_record::DepositRecord;
use pixflow_core::entities::payment_transaction::PaymentTransaction;
use pixflow_core::gateway::GatewayError;
use pixflow_core::processors::{ReconcileError, ReconcileOutcome, ReprocessError};
use pixflow_sdk::objects::admin::{
    AdminDebugLogResponse, AdminDepositRecordResponse, AdminTransactionResponse,
    ReconcileResponse,
};
use pixflow_sdk::objects::mask_cpf;

pub(crate) fn transaction_to_admin_response(t: &PaymentTransaction) -> AdminTransactionResponse {
    AdminTransactionResponse {
        id: t.id,
        external_id: t.external_id.clone(),
        correlation_id: t.correlation_id.clone(),
        direction: t.direction.into(),
        status: t.status.into(),
        amount: t.amount,
        amount_display: t.amount_display,
        user_id: t.user_id,
        person_name: t.person_name.clone(),
        person_cpf_masked: t.person_cpf.as_deref().map(mask_cpf),
        created_at: t.created_at.unix_timestamp(),
        updated_at: t.updated_at.unix_timestamp(),
        settled_at: t.settled_at.map(|at| at.unix_timestamp()),
    }
}

pub(crate) fn deposit_record_to_admin_response(r: &DepositRecord) -> AdminDepositRecordResponse {
    AdminDepositRecordResponse {
        id: r.id,
        external_id: r.external_id.clone(),
        user_id: r.user_id,
        amount: r.amount,
        method: r.method.clone(),
        created_at: r.created_at.unix_timestamp(),
    }
}

pub(crate) fn debug_log_to_admin_response(r: &DebugLogRecord) -> AdminDebugLogResponse {
    AdminDebugLogResponse {
        id: r.id,
        category: r.category.clone(),
        transaction_ref: r.transaction_ref.clone(),
        payload: r.payload.clone(),
        created_at: r.created_at.unix_timestamp(),
    }
}

pub(crate) fn outcome_to_response(outcome: &ReconcileOutcome) -> ReconcileResponse {
    let (reported_status, balance_after) = match outcome {
        ReconcileOutcome::Settled { balance_after, .. } => (None, *balance_after),
        ReconcileOutcome::AlreadyTerminal(_) => (None, None),
        ReconcileOutcome::LeftPending {
            reported_status, ..
        } => (Some(reported_status.clone()), None),
    };
    ReconcileResponse {
        outcome: outcome.as_str().to_owned(),
        status: outcome.status().into(),
        reported_status,
        balance_after,
    }
}
