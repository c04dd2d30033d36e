//! DigitoPay API client.
//!
//! - `POST {base}/token/api` with `{clientId, secret}` → `{accessToken, expiration}`
//! - `GET {base}/statusTransaction/{id}` with `Authorization: Bearer <token>`

use super::{AccessToken, GatewayError, GatewayStatus, PaymentGateway};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use pixflow_sdk::objects::{StatusPayload, TokenRequest, TokenResponse};
use reqwest::StatusCode;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Lifetime assumed when the gateway does not say when a token expires.
const DEFAULT_TOKEN_LIFETIME: time::Duration = time::Duration::minutes(5);

/// Cached tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: time::Duration = time::Duration::seconds(30);

struct CachedToken {
    client_id: String,
    token: AccessToken,
}

/// DigitoPay implementation of [`PaymentGateway`].
///
/// Reads credentials, base url and request timeout from the shared
/// [`GatewayConfig`] on every call, so a config reload takes effect without
/// rebuilding the client.
pub struct DigitoPayClient {
    config: Arc<RwLock<GatewayConfig>>,
    http_client: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl DigitoPayClient {
    pub fn new(config: Arc<RwLock<GatewayConfig>>) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }

    async fn cached_token(&self, client_id: &str) -> Option<AccessToken> {
        let cache = self.cache.lock().await;
        cache
            .as_ref()
            .filter(|c| c.client_id == client_id && c.token.is_fresh(TOKEN_REFRESH_MARGIN))
            .map(|c| c.token.clone())
    }

    async fn request_token(&self) -> Result<AccessToken, GatewayError> {
        let (url, body, timeout) = {
            let config = self.config.read().await;
            (
                config.base_url.join("token/api")?,
                TokenRequest {
                    client_id: config.client_id.clone(),
                    secret: config.client_secret.clone(),
                },
                config.request_timeout,
            )
        };

        let response = self
            .http_client
            .post(url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(GatewayError::Authentication {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&text).unwrap_or_default();
        let Some(token) = parsed.access_token.filter(|t| !t.is_empty()) else {
            return Err(GatewayError::Authentication {
                status: status.as_u16(),
                body: text,
            });
        };

        Ok(AccessToken {
            token,
            expires_at: parse_expiration(expiration_text(parsed.expiration).as_deref()),
        })
    }
}

fn expiration_text(raw: Option<serde_json::Value>) -> Option<String> {
    match raw? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interpret the gateway's `expiration` field.
///
/// Accepts an RFC 3339 timestamp, a unix timestamp, or a lifetime in
/// seconds. Anything else falls back to [`DEFAULT_TOKEN_LIFETIME`].
fn parse_expiration(raw: Option<&str>) -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now + DEFAULT_TOKEN_LIFETIME;
    };
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return at;
    }
    if let Ok(n) = raw.parse::<i64>() {
        // Values this small cannot be a unix timestamp of a live token.
        if n < 1_000_000_000 {
            return now + time::Duration::seconds(n);
        }
        if let Ok(at) = OffsetDateTime::from_unix_timestamp(n) {
            return at;
        }
    }
    warn!(expiration = raw, "Unrecognized token expiration, using default lifetime");
    now + DEFAULT_TOKEN_LIFETIME
}

#[async_trait]
impl PaymentGateway for DigitoPayClient {
    async fn authenticate(&self) -> Result<AccessToken, GatewayError> {
        let (cache_tokens, client_id) = {
            let config = self.config.read().await;
            (config.cache_tokens, config.client_id.clone())
        };

        if cache_tokens {
            if let Some(token) = self.cached_token(&client_id).await {
                debug!("Reusing cached gateway token");
                return Ok(token);
            }
        }

        let token = self.request_token().await?;

        if cache_tokens {
            *self.cache.lock().await = Some(CachedToken {
                client_id,
                token: token.clone(),
            });
        }

        Ok(token)
    }

    async fn transaction_status(
        &self,
        token: &AccessToken,
        transaction_id: &str,
    ) -> Result<GatewayStatus, GatewayError> {
        let (mut url, timeout) = {
            let config = self.config.read().await;
            (config.base_url.join("statusTransaction")?, config.request_timeout)
        };
        url.path_segments_mut()
            .map_err(|_| GatewayError::Parse("gateway base url cannot carry a path".into()))?
            .push(transaction_id);

        let response = self
            .http_client
            .get(url)
            .timeout(timeout)
            .bearer_auth(&token.token)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => return Err(GatewayError::NotFound(transaction_id.into())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                if self.config.read().await.cache_tokens {
                    *self.cache.lock().await = None;
                }
                return Err(GatewayError::Authentication {
                    status: status.as_u16(),
                    body: text,
                });
            }
            s if !s.is_success() => {
                return Err(GatewayError::Api {
                    status: s.as_u16(),
                    body: text,
                });
            }
            _ => {}
        }

        let raw: serde_json::Value = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| GatewayError::Parse(e.to_string()))?
        };
        if raw.is_null() {
            return Err(GatewayError::NotFound(transaction_id.into()));
        }

        let payload: StatusPayload = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::Parse(format!("{e}: {raw}")))?;

        Ok(GatewayStatus::new(payload.status())
            .with_value(payload.value())
            .with_raw(raw))
    }
}
