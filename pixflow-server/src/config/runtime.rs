//! Runtime configuration re-exports.
//!
//! The validated config types live in `pixflow-core::config` so the core
//! processors can read them; this module re-exports them for convenience.

pub use pixflow_core::config::{
    AdminConfig, GatewayConfig, ServerConfig, SharedConfig, WebhookConfig,
};
pub use pixflow_core::rates::ExchangeRate;
