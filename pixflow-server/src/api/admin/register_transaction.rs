use axum::{Json, http::StatusCode, response::IntoResponse};
use kanau::processor::Processor;
use pixflow_core::entities::payment_transaction::{NewPaymentTransaction, RegisterTransaction};
use pixflow_core::events::DebugLogEntry;
use pixflow_sdk::objects::admin::RegisterTransactionRequest;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, transaction_to_admin_response};

/// `POST /transactions` — register a pending transaction.
///
/// Called when a payment is initiated at the gateway, so that the webhook
/// that follows finds a transaction to settle.
pub async fn register_transaction(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Json(req): Json<RegisterTransactionRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let external_id = req.external_id.trim().to_owned();
    if external_id.is_empty() {
        return Err(AdminApiError::Validation("external_id is required".into()));
    }
    if req.amount <= Decimal::ZERO {
        return Err(AdminApiError::Validation("amount must be positive".into()));
    }
    if req.amount.scale() > 2 {
        return Err(AdminApiError::Validation(
            "amount has more than two decimal places".into(),
        ));
    }

    let amount_display = state.config.rates.read().await.to_display(req.amount);

    let created = state
        .db
        .process(RegisterTransaction {
            insert: NewPaymentTransaction {
                external_id: external_id.clone(),
                correlation_id: req
                    .correlation_id
                    .unwrap_or_else(|| Uuid::now_v7().to_string()),
                direction: req.direction.into(),
                amount: req.amount,
                amount_display,
                user_id: req.user_id,
                person_name: req.person_name,
                person_cpf: req.person_cpf,
                gateway_payload: req.gateway_payload,
            },
        })
        .await
        .map_err(AdminApiError::Database)?
        .ok_or_else(|| {
            AdminApiError::Conflict(format!("transaction {external_id} already exists"))
        })?;

    tracing::info!(
        external_id = %created.external_id,
        direction = created.direction.as_str(),
        amount = %created.amount,
        "Transaction registered"
    );
    state.debug_log.log(
        DebugLogEntry::new(
            "transaction_registered",
            json!({
                "direction": created.direction.as_str(),
                "amount": created.amount,
                "amount_display": created.amount_display,
                "user_id": created.user_id,
            }),
        )
        .for_transaction(created.external_id.clone()),
    );

    Ok((
        StatusCode::CREATED,
        Json(transaction_to_admin_response(&created)),
    ))
}
