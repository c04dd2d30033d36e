//! Admin API request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Direction, TransactionStatus};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Transaction detail for the admin API. The CPF is always masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminTransactionResponse {
    pub id: Uuid,
    pub external_id: String,
    pub correlation_id: String,
    pub direction: Direction,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub amount_display: Decimal,
    pub user_id: Uuid,
    pub person_name: Option<String>,
    pub person_cpf_masked: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub settled_at: Option<i64>,
}

/// Ledger row written once a deposit completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDepositRecordResponse {
    pub id: i64,
    pub external_id: String,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub created_at: i64,
}

/// One entry of the diagnostic trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDebugLogResponse {
    pub id: i64,
    pub category: String,
    pub transaction_ref: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: i64,
}

/// A transaction together with its deposit record and diagnostic trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetailResponse {
    pub transaction: AdminTransactionResponse,
    pub deposit_record: Option<AdminDepositRecordResponse>,
    pub debug_logs: Vec<AdminDebugLogResponse>,
}

/// Result of a reconciliation attempt triggered through the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    /// One of `settled`, `already_terminal`, `in_flight`, `unrecognized_status`.
    pub outcome: String,
    pub status: TransactionStatus,
    pub reported_status: Option<String>,
    pub balance_after: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Register a pending transaction created at payment initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTransactionRequest {
    pub external_id: String,
    /// Internal correlation id; generated when absent.
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub direction: Direction,
    /// Amount in the settlement currency (BRL).
    pub amount: Decimal,
    pub user_id: Uuid,
    #[serde(default)]
    pub person_name: Option<String>,
    #[serde(default)]
    pub person_cpf: Option<String>,
    #[serde(default)]
    pub gateway_payload: Option<serde_json::Value>,
}

/// Operator-supplied gateway status for a manual reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualReconcileRequest {
    pub status: String,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;
const MAX_OFFSET: i64 = 100_000;

/// Query parameters for listing transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTransactionsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl Default for ListTransactionsQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            status: None,
            direction: None,
            user_id: None,
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Clamp limit and offset to safe maximums.
pub fn clamp_pagination(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_LIMIT), offset.clamp(0, MAX_OFFSET))
}
