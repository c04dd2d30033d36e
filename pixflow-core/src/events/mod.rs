//! Event system.
//!
//! The only event stream is the diagnostic one:
//! `DebugLogger` → `DebugLogEntry` → `DebugLogWriter` → sink.

pub mod channels;
pub mod types;

pub use channels::{DEFAULT_CHANNEL_BUFFER, DebugLogReceiver, DebugLogSender, debug_log_channel};
pub use types::DebugLogEntry;
