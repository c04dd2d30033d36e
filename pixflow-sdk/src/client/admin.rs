//! Admin API client (operator tooling → pixflow server).
//!
//! All requests carry the plaintext admin secret in the
//! `Pixflow-Admin-Authorization` header. This replaces hand-run
//! reprocessing scripts: every balance-affecting action goes through the
//! server's reconciler.

use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::admin::{
    AdminDebugLogResponse, AdminTransactionResponse, ListTransactionsQuery,
    ManualReconcileRequest, ReconcileResponse, RegisterTransactionRequest,
    TransactionDetailResponse,
};
use crate::signature::ADMIN_AUTH_HEADER;

/// Typed HTTP client for the pixflow **Admin API**.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: String,
}

impl AdminClient {
    /// Create a new `AdminClient`.
    ///
    /// * `base_url` – root URL of the pixflow server.
    /// * `admin_secret` – the plaintext admin secret.
    pub fn new(base_url: Url, admin_secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret: admin_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    fn transaction_url(&self, external_id: &str, suffix: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(&format!(
            "/api/v1/admin/transactions/{}{}",
            urlencoding::encode(external_id),
            suffix
        ))?)
    }

    /// `GET /api/v1/admin/transactions` – list transactions with optional filters.
    pub async fn list_transactions(
        &self,
        query: &ListTransactionsQuery,
    ) -> Result<Vec<AdminTransactionResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/admin/transactions")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/admin/transactions` – register a pending transaction.
    pub async fn register_transaction(
        &self,
        request: &RegisterTransactionRequest,
    ) -> Result<AdminTransactionResponse, ClientError> {
        let url = self.base_url.join("/api/v1/admin/transactions")?;

        let resp = self
            .http
            .post(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .json(request)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/admin/transactions/{external_id}` – transaction with its
    /// deposit record and diagnostic trail.
    pub async fn get_transaction(
        &self,
        external_id: &str,
    ) -> Result<TransactionDetailResponse, ClientError> {
        let url = self.transaction_url(external_id, "")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/admin/transactions/{external_id}/reprocess` – poll the
    /// gateway for the current status and reconcile it.
    pub async fn reprocess(&self, external_id: &str) -> Result<ReconcileResponse, ClientError> {
        let url = self.transaction_url(external_id, "/reprocess")?;

        let resp = self
            .http
            .post(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/admin/transactions/{external_id}/reconcile` – reconcile
    /// with an operator-supplied gateway status.
    pub async fn reconcile(
        &self,
        external_id: &str,
        status: impl Into<String>,
    ) -> Result<ReconcileResponse, ClientError> {
        let url = self.transaction_url(external_id, "/reconcile")?;

        let resp = self
            .http
            .post(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .json(&ManualReconcileRequest {
                status: status.into(),
            })
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/admin/transactions/{external_id}/logs` – diagnostic trail.
    pub async fn list_debug_logs(
        &self,
        external_id: &str,
    ) -> Result<Vec<AdminDebugLogResponse>, ClientError> {
        let url = self.transaction_url(external_id, "/logs")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;

        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
