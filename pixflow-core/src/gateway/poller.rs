use super::{GatewayError, GatewayStatus, PaymentGateway};
use crate::debug_log::DebugLogger;
use crate::events::DebugLogEntry;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Asks the gateway what it currently believes a transaction's status is.
///
/// Every lookup, successful or not, is mirrored to the debug log. The
/// poller never changes local state; callers decide what to do with the
/// answer.
#[derive(Clone)]
pub struct StatusPoller {
    gateway: Arc<dyn PaymentGateway>,
    debug_log: DebugLogger,
}

impl StatusPoller {
    pub fn new(gateway: Arc<dyn PaymentGateway>, debug_log: DebugLogger) -> Self {
        Self { gateway, debug_log }
    }

    /// Authenticate and fetch the current status of `external_id`.
    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self, external_id: &str) -> Result<GatewayStatus, GatewayError> {
        let token = match self.gateway.authenticate().await {
            Ok(token) => token,
            Err(e) => {
                self.log_failure(external_id, "authenticate", &e);
                return Err(e);
            }
        };

        match self.gateway.transaction_status(&token, external_id).await {
            Ok(status) => {
                info!(status = %status.status, "Gateway status fetched");
                self.debug_log.log(
                    DebugLogEntry::new(
                        "status_poll",
                        json!({
                            "status": status.status,
                            "value": status.value,
                            "response": status.raw,
                        }),
                    )
                    .for_transaction(external_id),
                );
                Ok(status)
            }
            Err(e) => {
                self.log_failure(external_id, "status", &e);
                Err(e)
            }
        }
    }

    fn log_failure(&self, external_id: &str, stage: &str, error: &GatewayError) {
        warn!(stage, error = %error, "Gateway status lookup failed");
        self.debug_log.log(
            DebugLogEntry::new(
                "status_poll_failed",
                json!({
                    "stage": stage,
                    "kind": error.kind(),
                    "retryable": error.is_retryable(),
                    "error": error.to_string(),
                }),
            )
            .for_transaction(external_id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::MemoryDebugLogSink;
    use crate::gateway::AccessToken;
    use async_trait::async_trait;
    use time::OffsetDateTime;

    struct FixedGateway {
        auth_ok: bool,
        status: Option<&'static str>,
    }

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn authenticate(&self) -> Result<AccessToken, GatewayError> {
            if !self.auth_ok {
                return Err(GatewayError::Authentication {
                    status: 401,
                    body: "bad credentials".into(),
                });
            }
            Ok(AccessToken {
                token: "tok".into(),
                expires_at: OffsetDateTime::now_utc() + time::Duration::minutes(5),
            })
        }

        async fn transaction_status(
            &self,
            _token: &AccessToken,
            transaction_id: &str,
        ) -> Result<GatewayStatus, GatewayError> {
            self.status
                .map(GatewayStatus::new)
                .ok_or_else(|| GatewayError::NotFound(transaction_id.into()))
        }
    }

    fn poller(auth_ok: bool, status: Option<&'static str>) -> (StatusPoller, crate::events::DebugLogReceiver) {
        let (logger, rx) = DebugLogger::new(Arc::new(MemoryDebugLogSink::new()));
        (
            StatusPoller::new(Arc::new(FixedGateway { auth_ok, status }), logger),
            rx,
        )
    }

    #[tokio::test]
    async fn successful_poll_is_logged() {
        let (poller, mut rx) = poller(true, Some("REALIZADO"));
        let status = poller.get_status("dep_1").await.unwrap();
        assert_eq!(status.status, "REALIZADO");

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.category, "status_poll");
        assert_eq!(entry.transaction_ref.as_deref(), Some("dep_1"));
        assert_eq!(entry.payload["status"], "REALIZADO");
    }

    #[tokio::test]
    async fn authentication_failure_stops_before_lookup() {
        let (poller, mut rx) = poller(false, Some("REALIZADO"));
        let err = poller.get_status("dep_1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Authentication { .. }));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.category, "status_poll_failed");
        assert_eq!(entry.payload["stage"], "authenticate");
        assert_eq!(entry.payload["kind"], "authentication_failure");
    }

    #[tokio::test]
    async fn unknown_transaction_is_logged_as_not_found() {
        let (poller, mut rx) = poller(true, None);
        let err = poller.get_status("dep_missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
        assert_eq!(rx.try_recv().unwrap().payload["kind"], "not_found");
    }
}
