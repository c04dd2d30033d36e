use axum::{Json, extract::Path, response::IntoResponse};
use pixflow_core::events::DebugLogEntry;
use pixflow_core::gateway::GatewayStatus;
use pixflow_sdk::objects::admin::ManualReconcileRequest;
use serde_json::json;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, outcome_to_response};

/// `POST /transactions/{external_id}/reconcile` — reconcile with a status
/// supplied by the operator, for when the gateway cannot be queried.
pub async fn reconcile(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path(external_id): Path<String>,
    Json(req): Json<ManualReconcileRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    if req.status.trim().is_empty() {
        return Err(AdminApiError::Validation("status is required".into()));
    }

    tracing::info!(%external_id, status = %req.status, "Admin manual reconcile requested");
    state.debug_log.log(
        DebugLogEntry::new("manual_reconcile", json!({ "status": req.status }))
            .for_transaction(external_id.clone()),
    );

    let outcome = state
        .reconciler
        .reconcile(&external_id, &GatewayStatus::new(req.status))
        .await
        .map_err(AdminApiError::Reconcile)?;
    Ok(Json(outcome_to_response(&outcome)))
}
