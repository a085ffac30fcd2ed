// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted send queue.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DealmailError;
use crate::types::{NewQueueEntry, QueueEntry, QueueSummary, QueueTail};

/// The queue of scheduled sends, owned and mutated by the job.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Identities with a pending entry in any campaign.
    async fn queued_identities(&self) -> Result<HashSet<String>, DealmailError>;

    /// Latest scheduled instant of a campaign and the number of entries at it.
    async fn queue_tail(&self, campaign: &str) -> Result<Option<QueueTail>, DealmailError>;

    /// Sends of a campaign scheduled in `from..=until`, counting both pending
    /// entries and confirmed sends still in the ledger.
    async fn count_scheduled_between(
        &self,
        campaign: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u32, DealmailError>;

    /// Insert every entry or none of them. Returns the inserted count.
    async fn insert_batch(&self, entries: &[NewQueueEntry]) -> Result<usize, DealmailError>;

    /// Entries with `scheduled_at < now`, oldest first, at most `limit`.
    async fn due_entries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, DealmailError>;

    /// Delete the given entries. Returns the deleted count.
    async fn remove(&self, ids: &[i64]) -> Result<usize, DealmailError>;

    /// Queue counts for one campaign.
    async fn summary(&self, campaign: &str, now: DateTime<Utc>)
    -> Result<QueueSummary, DealmailError>;
}
