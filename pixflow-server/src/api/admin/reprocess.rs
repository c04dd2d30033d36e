use axum::{Json, extract::Path, response::IntoResponse};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, outcome_to_response};

/// `POST /transactions/{external_id}/reprocess` — manual fallback for a lost
/// webhook: ask the gateway for the current status and reconcile with it.
pub async fn reprocess(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Path(external_id): Path<String>,
) -> Result<impl IntoResponse, AdminApiError> {
    tracing::info!(%external_id, "Admin reprocess requested");
    let outcome = state
        .reconciler
        .reprocess(&external_id, &state.poller)
        .await?;
    Ok(Json(outcome_to_response(&outcome)))
}
