use axum::{Json, extract::Query, response::IntoResponse};
use kanau::processor::Processor;
use pixflow_core::entities::payment_transaction::ListTransactions;
use pixflow_sdk::objects::admin::{ListTransactionsQuery, clamp_pagination};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, transaction_to_admin_response};

/// `GET /transactions` — list transactions with pagination and optional filters.
pub async fn list_transactions(
    state: axum::extract::State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);

    let records = state
        .db
        .process(ListTransactions {
            limit,
            offset,
            status: query.status.map(Into::into),
            direction: query.direction.map(Into::into),
            user_id: query.user_id,
        })
        .await
        .map_err(AdminApiError::Database)?;

    let response: Vec<_> = records.iter().map(transaction_to_admin_response).collect();
    Ok(Json(response))
}
