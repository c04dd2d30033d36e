//! Application state shared across all request handlers.

use pixflow_core::config::SharedConfig;
use pixflow_core::debug_log::DebugLogger;
use pixflow_core::framework::DatabaseProcessor;
use pixflow_core::gateway::StatusPoller;
use pixflow_core::processors::Reconciler;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Query processor over the connection pool.
    pub db: DatabaseProcessor,
    /// Runtime configuration (sections can be reloaded via SIGHUP).
    pub config: SharedConfig,
    /// The only code path that settles transactions.
    pub reconciler: Arc<Reconciler>,
    pub poller: StatusPoller,
    pub debug_log: DebugLogger,
}
