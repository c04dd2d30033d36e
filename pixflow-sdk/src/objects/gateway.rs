//! DigitoPay gateway payloads.
//!
//! Field names follow the gateway's camelCase JSON.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST {base}/token/api`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub client_id: String,
    pub secret: String,
}

/// Answer of `POST {base}/token/api`.
///
/// Both fields are optional on the wire so that a 2xx answer without a
/// token can be reported as an authentication failure instead of a
/// parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    /// RFC 3339 timestamp, unix timestamp or lifetime in seconds.
    /// Sent either as a string or as a number.
    #[serde(default)]
    pub expiration: Option<serde_json::Value>,
}

/// Answer of `GET {base}/statusTransaction/{id}`.
///
/// The gateway answers either with a bare status string or with an
/// object carrying at least `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusPayload {
    Bare(String),
    Detailed(GatewayTransactionStatus),
}

/// Object form of the status answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayTransactionStatus {
    pub status: String,
    #[serde(default, deserialize_with = "super::webhook::optional_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StatusPayload {
    /// The gateway's status string, untouched.
    pub fn status(&self) -> &str {
        match self {
            StatusPayload::Bare(s) => s,
            StatusPayload::Detailed(d) => &d.status,
        }
    }

    /// The amount reported by the gateway, if any.
    pub fn value(&self) -> Option<Decimal> {
        match self {
            StatusPayload::Bare(_) => None,
            StatusPayload::Detailed(d) => d.value,
        }
    }
}
