//! Processors that act on transactions.
//!
//! - `Reconciler`: applies gateway statuses to the ledger
//! - `DebugLogWriter`: persists queued debug log entries

pub mod debug_log_writer;
pub mod reconciler;

pub use debug_log_writer::DebugLogWriter;
pub use reconciler::{
    ReconcileError, ReconcileOutcome, Reconciler, ReprocessError, StatusMapping,
    map_gateway_status,
};
