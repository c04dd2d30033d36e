//! Webhook Receiver.
//!
//! `POST /digitopay` takes the gateway callback, records it verbatim in the
//! debug log, checks the signature when a secret is configured, and hands
//! the reported status to the reconciler. Deliveries are at-least-once; the
//! reconciler makes replays harmless.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use pixflow_core::events::DebugLogEntry;
use pixflow_core::gateway::GatewayStatus;
use pixflow_core::processors::ReconcileError;
use pixflow_sdk::objects::{GatewayWebhook, WebhookAck, mask_cpf};
use pixflow_sdk::signature::{self, SIGNATURE_HEADER};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/digitopay", post(receive_webhook))
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookApiError {
    #[error("missing Pixflow-Signature header")]
    MissingSignature,
    #[error("signature verification failed: {0}")]
    BadSignature(signature::SignatureError),
    #[error("malformed webhook body: {0}")]
    Malformed(serde_json::Error),
    #[error("reconciliation failed: {0}")]
    Reconcile(ReconcileError),
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookApiError::MissingSignature | WebhookApiError::BadSignature(_) => {
                StatusCode::UNAUTHORIZED
            }
            WebhookApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            WebhookApiError::Reconcile(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.to_string()).into_response()
    }
}

/// What the evidence log keeps of a delivery.
///
/// `raw` is the body text exactly as received. `parsed` is only used to
/// pull the transaction id out and to attach the payload to the deposit
/// record; it is never what gets logged.
struct Evidence {
    raw: String,
    parsed: Option<serde_json::Value>,
    transaction_ref: Option<String>,
}

fn evidence(body: &[u8]) -> Evidence {
    let raw = String::from_utf8_lossy(body).into_owned();
    let parsed = serde_json::from_slice::<serde_json::Value>(body).ok();
    let transaction_ref = parsed.as_ref().and_then(|v| match v.get("id") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });
    Evidence {
        raw,
        parsed,
        transaction_ref,
    }
}

/// `POST /digitopay` — receive a gateway callback.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookApiError> {
    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    // Evidence first: nothing below may run before the body is on record.
    let Evidence {
        raw,
        parsed,
        transaction_ref,
    } = evidence(&body);
    let mut entry = DebugLogEntry::new(
        "webhook_received",
        json!({ "raw": &raw, "signed": signature_header.is_some() }),
    );
    if let Some(id) = &transaction_ref {
        entry = entry.for_transaction(id.clone());
    }
    state.debug_log.record(entry).await;

    let (secret, strict) = {
        let config = state.config.webhook.read().await;
        (config.secret.clone(), config.strict)
    };

    if let Some(secret) = secret {
        let verified = signature_header
            .as_deref()
            .ok_or(WebhookApiError::MissingSignature)
            .and_then(|h| {
                signature::verify_body(h, &body, &secret).map_err(WebhookApiError::BadSignature)
            });
        if let Err(e) = verified {
            tracing::warn!(error = %e, "Rejected webhook");
            state.debug_log.log(rejection_entry("webhook_rejected", &e, &transaction_ref));
            return Err(e);
        }
    }

    let webhook: GatewayWebhook = match serde_json::from_slice(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            let e = WebhookApiError::Malformed(e);
            tracing::warn!(error = %e, "Rejected webhook");
            state.debug_log.log(rejection_entry("webhook_malformed", &e, &transaction_ref));
            return Err(e);
        }
    };

    tracing::info!(
        external_id = %webhook.id,
        status = %webhook.status,
        direction_hint = ?webhook.direction_hint(),
        person_cpf = ?webhook.person.as_ref().and_then(|p| p.cpf.as_deref()).map(mask_cpf),
        "Webhook accepted"
    );

    let reported = GatewayStatus::new(webhook.status.clone())
        .with_value(webhook.value)
        .with_raw(parsed.unwrap_or(serde_json::Value::String(raw)));

    match state.reconciler.reconcile(&webhook.id, &reported).await {
        Ok(outcome) => Ok(Json(WebhookAck {
            accepted: true,
            outcome: outcome.as_str().to_owned(),
        })),
        // Not retried: a redelivery cannot create the missing transaction.
        Err(ReconcileError::TransactionNotFound(_)) => Ok(Json(WebhookAck {
            accepted: true,
            outcome: "unknown_transaction".to_owned(),
        })),
        Err(e) if strict => Err(WebhookApiError::Reconcile(e)),
        Err(e) => {
            tracing::warn!(error = %e, "Reconciliation deferred to manual reprocessing");
            Ok(Json(WebhookAck {
                accepted: true,
                outcome: "deferred".to_owned(),
            }))
        }
    }
}

fn rejection_entry(
    category: &str,
    error: &WebhookApiError,
    transaction_ref: &Option<String>,
) -> DebugLogEntry {
    let entry = DebugLogEntry::new(category, json!({ "error": error.to_string() }));
    match transaction_ref {
        Some(id) => entry.for_transaction(id.clone()),
        None => entry,
    }
}
