// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Buffers a scheduling pass and writes it in one batch.

use dealmail_core::{DealmailError, NewQueueEntry, QueueStore, RetryPolicy};
use tracing::{error, info};

/// Collects the entries of one scheduling pass.
///
/// Nothing reaches the queue until [`flush`](QueueAccumulator::flush), and
/// the flush inserts every entry or none.
#[derive(Debug, Default)]
pub struct QueueAccumulator {
    entries: Vec<NewQueueEntry>,
}

impl QueueAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: NewQueueEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NewQueueEntry] {
        &self.entries
    }

    /// Persist the buffered entries with one bulk insert.
    ///
    /// An empty buffer is a logged no-op.
    pub async fn flush(
        self,
        store: &dyn QueueStore,
        retry: &RetryPolicy,
        campaign: &str,
    ) -> Result<usize, DealmailError> {
        if self.entries.is_empty() {
            info!(campaign, inserted = 0, "no new queue entries");
            return Ok(0);
        }

        let inserted = retry
            .run("insert_batch", || store.insert_batch(&self.entries))
            .await
            .inspect_err(|e| error!(campaign, error = %e, "queue insert failed"))?;

        if let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) {
            info!(
                campaign,
                inserted,
                first = %first.scheduled_at,
                last = %last.scheduled_at,
                "queue entries inserted"
            );
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dealmail_test_utils::MemoryStore;

    fn entry(identity: &str) -> NewQueueEntry {
        NewQueueEntry {
            identity: identity.to_string(),
            campaign: "yearly".to_string(),
            locale: "fi".to_string(),
            display_name: "te".to_string(),
            scheduled_at: Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn empty_flush_is_a_no_op() {
        let store = MemoryStore::new();
        let inserted = QueueAccumulator::new()
            .flush(&store, &RetryPolicy::none(), "yearly")
            .await
            .unwrap();
        assert_eq!(inserted, 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn flush_writes_all_entries() {
        let store = MemoryStore::new();
        let mut acc = QueueAccumulator::new();
        acc.push(entry("a@example.com"));
        acc.push(entry("b@example.com"));

        let inserted = acc.flush(&store, &RetryPolicy::none(), "yearly").await.unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(store.queue_entries().await.len(), 2);
        assert!(logs_contain("queue entries inserted"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn failed_flush_is_logged_and_writes_nothing() {
        let store = MemoryStore::new();
        store.fail_next_insert("disk I/O error").await;
        let mut acc = QueueAccumulator::new();
        acc.push(entry("a@example.com"));

        let result = acc.flush(&store, &RetryPolicy::none(), "yearly").await;

        assert!(result.is_err());
        assert!(store.queue_entries().await.is_empty());
        assert!(logs_contain("queue insert failed"));
    }
}
