//! Configuration types for pixflow.
//!
//! These types represent the validated runtime configuration used by the
//! server. The actual config loading/parsing is handled by the server crate.

mod admin;
mod gateway;
mod server;
mod webhook;

pub use admin::AdminConfig;
pub use gateway::GatewayConfig;
pub use server::ServerConfig;
pub use webhook::WebhookConfig;

use crate::rates::ExchangeRate;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// This allows independent access to different configuration sections
/// without blocking other readers/writers.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address, etc.).
    pub server: Arc<RwLock<ServerConfig>>,
    /// Admin configuration (authentication).
    pub admin: Arc<RwLock<AdminConfig>>,
    /// DigitoPay credentials. Also held by the gateway client.
    pub gateway: Arc<RwLock<GatewayConfig>>,
    /// Webhook receiver settings.
    pub webhook: Arc<RwLock<WebhookConfig>>,
    /// Settlement → display currency rate.
    pub rates: Arc<RwLock<ExchangeRate>>,
}
