//! Payment gateway access: the Authenticator and the Status Poller.
//!
//! - [`PaymentGateway`]: client-credentials token exchange and status lookup
//! - [`DigitoPayClient`]: the DigitoPay implementation over `reqwest`
//! - [`StatusPoller`]: authenticate + look up, mirrored to the debug log

mod digitopay;
mod poller;

pub use digitopay::DigitoPayClient;
pub use poller::StatusPoller;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use time::OffsetDateTime;

/// Bearer token obtained from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl AccessToken {
    /// Whether the token is still usable `margin` from now.
    pub fn is_fresh(&self, margin: time::Duration) -> bool {
        OffsetDateTime::now_utc() + margin < self.expires_at
    }
}

/// A status reported by the gateway for one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayStatus {
    /// The gateway's status string, untouched.
    pub status: String,
    /// Amount the gateway reports, when it reports one.
    pub value: Option<Decimal>,
    /// Full payload as received.
    pub raw: serde_json::Value,
}

impl GatewayStatus {
    pub fn new(status: impl Into<String>) -> Self {
        let status = status.into();
        Self {
            raw: serde_json::Value::String(status.clone()),
            status,
            value: None,
        }
    }

    pub fn with_value(mut self, value: Option<Decimal>) -> Self {
        self.value = value;
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }
}

/// Errors that can occur while talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad credentials or the token endpoint refused us.
    #[error("authentication failed with status {status}: {body}")]
    Authentication { status: u16, body: String },

    /// The gateway does not know this transaction id.
    #[error("transaction not found at gateway: {0}")]
    NotFound(String),

    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other non-2xx answer.
    #[error("gateway returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// A 2xx answer we could not understand.
    #[error("unexpected gateway response: {0}")]
    Parse(String),

    #[error("invalid gateway url: {0}")]
    Url(#[from] url::ParseError),
}

impl GatewayError {
    /// Whether re-invoking the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Short tag used in debug log payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Authentication { .. } => "authentication_failure",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Transport(_) => "transient_transport",
            GatewayError::Api { .. } => "gateway_error",
            GatewayError::Parse(_) => "unexpected_response",
            GatewayError::Url(_) => "invalid_url",
        }
    }
}

/// A payment gateway that can authenticate and report transaction status.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exchange the configured client credentials for a bearer token.
    async fn authenticate(&self) -> Result<AccessToken, GatewayError>;

    /// Look up the status of a transaction by the gateway's own id.
    async fn transaction_status(
        &self,
        token: &AccessToken,
        transaction_id: &str,
    ) -> Result<GatewayStatus, GatewayError>;
}
