//! Event type definitions.
//!
//! Events are ephemeral: they travel over in-process channels and are
//! persisted, if at all, by the processor that consumes them.

use time::OffsetDateTime;

/// One diagnostic event destined for the debug log.
///
/// `category` is a short tag such as `webhook_received` or
/// `status_poll_failed`; `payload` is arbitrary JSON. Entries are only
/// ever appended and never read by business logic.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugLogEntry {
    pub category: String,
    pub transaction_ref: Option<String>,
    pub payload: serde_json::Value,
    pub logged_at: OffsetDateTime,
}

impl DebugLogEntry {
    pub fn new(category: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            category: category.into(),
            transaction_ref: None,
            payload,
            logged_at: OffsetDateTime::now_utc(),
        }
    }

    /// Attach the gateway transaction id this entry is about.
    pub fn for_transaction(mut self, external_id: impl Into<String>) -> Self {
        self.transaction_ref = Some(external_id.into());
        self
    }
}
