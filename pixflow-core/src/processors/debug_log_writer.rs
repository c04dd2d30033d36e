//! DebugLogWriter processor.
//!
//! Drains the debug log channel into a [`DebugLogSink`]. On shutdown the
//! entries already queued are written before the task exits.

use crate::debug_log::DebugLogSink;
use crate::events::{DebugLogEntry, DebugLogReceiver};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct DebugLogWriter {
    sink: Arc<dyn DebugLogSink>,
    rx: DebugLogReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

impl DebugLogWriter {
    pub fn new(
        sink: Arc<dyn DebugLogSink>,
        rx: DebugLogReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            sink,
            rx,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        info!("DebugLogWriter started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("DebugLogWriter received shutdown signal");
                        break;
                    }
                }

                entry = self.rx.recv() => match entry {
                    Some(entry) => self.write(entry).await,
                    None => {
                        info!("Debug log channel closed");
                        break;
                    }
                },
            }
        }

        self.rx.close();
        let mut drained = 0usize;
        while let Ok(entry) = self.rx.try_recv() {
            self.write(entry).await;
            drained += 1;
        }
        info!(drained, "DebugLogWriter stopped");
    }

    async fn write(&self, entry: DebugLogEntry) {
        debug!(category = %entry.category, "Persisting debug log entry");
        let category = entry.category.clone();
        let transaction_ref = entry.transaction_ref.clone();
        if let Err(e) = self.sink.write(entry).await {
            warn!(
                %category,
                ?transaction_ref,
                error = %e,
                "Failed to persist debug log entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::{DebugLogger, MemoryDebugLogSink};
    use serde_json::json;

    #[tokio::test]
    async fn writes_queued_entries_and_drains_on_shutdown() {
        let sink = Arc::new(MemoryDebugLogSink::new());
        let (logger, rx) = DebugLogger::new(sink.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        logger.log(DebugLogEntry::new("first", json!({})));
        logger.log(DebugLogEntry::new("second", json!({})).for_transaction("dep_1"));

        let handle = tokio::spawn(DebugLogWriter::new(sink.clone(), rx, shutdown_rx).run());
        logger.log(DebugLogEntry::new("third", json!({})));
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(sink.categories().await, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn stops_when_every_logger_is_dropped() {
        let sink = Arc::new(MemoryDebugLogSink::new());
        let (logger, rx) = DebugLogger::new(sink.clone());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        logger.log(DebugLogEntry::new("only", json!(null)));
        drop(logger);

        DebugLogWriter::new(sink.clone(), rx, shutdown_rx).run().await;
        assert_eq!(sink.categories().await, vec!["only"]);
    }
}
