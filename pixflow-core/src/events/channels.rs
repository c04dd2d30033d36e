//! Event channel factories and handles.

use super::types::DebugLogEntry;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for DebugLogEntry events.
pub type DebugLogSender = mpsc::Sender<DebugLogEntry>;
/// Receiver handle for DebugLogEntry events.
pub type DebugLogReceiver = mpsc::Receiver<DebugLogEntry>;

/// Create a new DebugLogEntry channel.
///
/// Multiple senders can be cloned from the returned sender; the single
/// receiver belongs to the `DebugLogWriter`.
pub fn debug_log_channel() -> (DebugLogSender, DebugLogReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
