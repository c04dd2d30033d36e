use axum::{Json, extract::Path, response::IntoResponse};
use kanau::processor::Processor;
use pixflow_core::entities::debug_log::ListDebugLogsForTransaction;
use pixflow_core::entities::deposit_record::GetDepositRecordByExternalId;
use pixflow_core::entities::payment_transaction::GetTransactionByExternalId;
use pixflow_sdk::objects::admin::TransactionDetailResponse;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{
    AdminApiError, DEBUG_LOG_LIMIT, debug_log_to_admin_response, deposit_record_to_admin_response,
    transaction_to_admin_response,
};

/// `GET /transactions/{external_id}` — a transaction with its deposit record
/// and debug trail.
pub async fn get_transaction(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path(external_id): Path<String>,
) -> Result<impl IntoResponse, AdminApiError> {
    let transaction = state
        .db
        .process(GetTransactionByExternalId {
            external_id: external_id.clone(),
        })
        .await
        .map_err(AdminApiError::Database)?
        .ok_or(AdminApiError::NotFound)?;

    let deposit_record = state
        .db
        .process(GetDepositRecordByExternalId {
            external_id: external_id.clone(),
        })
        .await
        .map_err(AdminApiError::Database)?;

    let debug_logs = state
        .db
        .process(ListDebugLogsForTransaction {
            transaction_ref: external_id,
            limit: DEBUG_LOG_LIMIT,
        })
        .await
        .map_err(AdminApiError::Database)?;

    Ok(Json(TransactionDetailResponse {
        transaction: transaction_to_admin_response(&transaction),
        deposit_record: deposit_record.as_ref().map(deposit_record_to_admin_response),
        debug_logs: debug_logs.iter().map(debug_log_to_admin_response).collect(),
    }))
}
