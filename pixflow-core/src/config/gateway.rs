//! DigitoPay gateway configuration.

use std::time::Duration;
use url::Url;

/// Credentials and endpoint for the DigitoPay API.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API root, always ending in `/` so relative joins keep its path.
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: String,
    /// Reuse bearer tokens until shortly before they expire.
    pub cache_tokens: bool,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(
        mut base_url: Url,
        client_id: String,
        client_secret: String,
        cache_tokens: bool,
        request_timeout: Duration,
    ) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            client_id,
            client_secret,
            cache_tokens,
            request_timeout,
        }
    }
}
