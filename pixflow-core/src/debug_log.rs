//! Append-only diagnostic log.
//!
//! Everything that touches a transaction leaves a trace here so that what
//! happened can be reconstructed later without reproducing it. Logging is
//! best effort: no method on [`DebugLogger`] ever returns an error to its
//! caller.

use crate::entities::debug_log::InsertDebugLog;
use crate::events::{DebugLogEntry, DebugLogReceiver, DebugLogSender, debug_log_channel};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Destination for debug log entries.
#[async_trait]
pub trait DebugLogSink: Send + Sync {
    async fn write(&self, entry: DebugLogEntry) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl DebugLogSink for DatabaseProcessor {
    async fn write(&self, entry: DebugLogEntry) -> Result<(), sqlx::Error> {
        self.process(InsertDebugLog {
            category: entry.category,
            transaction_ref: entry.transaction_ref,
            payload: entry.payload,
            created_at: entry.logged_at,
        })
        .await
    }
}

/// Keeps entries in memory. Used by tests and dry runs.
#[derive(Default)]
pub struct MemoryDebugLogSink {
    entries: Mutex<Vec<DebugLogEntry>>,
}

impl MemoryDebugLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<DebugLogEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn categories(&self) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|e| e.category.clone())
            .collect()
    }
}

#[async_trait]
impl DebugLogSink for MemoryDebugLogSink {
    async fn write(&self, entry: DebugLogEntry) -> Result<(), sqlx::Error> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

/// Cloneable handle for writing to the debug log.
#[derive(Clone)]
pub struct DebugLogger {
    tx: DebugLogSender,
    sink: Arc<dyn DebugLogSink>,
}

impl DebugLogger {
    /// Create a logger writing to `sink`.
    ///
    /// The returned receiver must be handed to a
    /// [`DebugLogWriter`](crate::processors::DebugLogWriter); entries queued
    /// through [`log`](Self::log) are persisted by it.
    pub fn new(sink: Arc<dyn DebugLogSink>) -> (Self, DebugLogReceiver) {
        let (tx, rx) = debug_log_channel();
        (Self { tx, sink }, rx)
    }

    /// Queue an entry. Never blocks and never fails the caller.
    pub fn log(&self, entry: DebugLogEntry) {
        debug!(
            category = %entry.category,
            transaction_ref = ?entry.transaction_ref,
            "debug log entry"
        );
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                warn!(
                    category = %entry.category,
                    transaction_ref = ?entry.transaction_ref,
                    payload = %entry.payload,
                    "Debug log channel full, entry dropped"
                );
            }
            Err(TrySendError::Closed(entry)) => {
                warn!(
                    category = %entry.category,
                    transaction_ref = ?entry.transaction_ref,
                    payload = %entry.payload,
                    "Debug log channel closed, entry dropped"
                );
            }
        }
    }

    /// Write an entry straight to the sink and wait for it.
    ///
    /// Used where the evidence must exist before processing continues.
    /// Sink errors are traced and swallowed.
    pub async fn record(&self, entry: DebugLogEntry) {
        let category = entry.category.clone();
        let transaction_ref = entry.transaction_ref.clone();
        if let Err(e) = self.sink.write(entry).await {
            warn!(
                category = %category,
                transaction_ref = ?transaction_ref,
                error = %e,
                "Failed to persist debug log entry"
            );
        }
    }
}
