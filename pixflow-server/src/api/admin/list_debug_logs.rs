use axum::{Json, extract::Path, response::IntoResponse};
use kanau::processor::Processor;
use pixflow_core::entities::debug_log::ListDebugLogsForTransaction;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, DEBUG_LOG_LIMIT, debug_log_to_admin_response};

/// `GET /transactions/{external_id}/logs` — debug trail, oldest first.
///
/// Entries are keyed by gateway id, so this also works for ids that never
/// became a transaction.
pub async fn list_debug_logs(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path(external_id): Path<String>,
) -> Result<impl IntoResponse, AdminApiError> {
    let records = state
        .db
        .process(ListDebugLogsForTransaction {
            transaction_ref: external_id,
            limit: DEBUG_LOG_LIMIT,
        })
        .await
        .map_err(AdminApiError::Database)?;

    let response: Vec<_> = records.iter().map(debug_log_to_admin_response).collect();
    Ok(Json(response))
}
