//! Webhook receiver configuration.

/// How the webhook receiver authenticates and acknowledges deliveries.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Shared HMAC secret. When absent, webhooks are accepted unsigned.
    pub secret: Option<Box<[u8]>>,
    /// Answer non-2xx when reconciliation fails so the gateway redelivers.
    /// When off, failures are acknowledged and left for reprocessing.
    pub strict: bool,
}

