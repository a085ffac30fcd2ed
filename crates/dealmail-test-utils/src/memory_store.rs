// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory queue and sent ledger.
//!
//! `MemoryStore` implements every store trait over plain vectors and can be
//! told to fail the next insert or commit, for exercising error paths.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use dealmail_core::{
    DealmailError, DeliveryStore, NewQueueEntry, QueueEntry, QueueStore, QueueSummary, QueueTail,
    SentLedger, SentRecord,
};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    queue: Vec<QueueEntry>,
    sent: Vec<SentRecord>,
    fail_insert: Option<String>,
    fail_commit: Option<String>,
}

/// A store that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_batch` fail with a storage error.
    pub async fn fail_next_insert(&self, message: &str) {
        self.state.lock().await.fail_insert = Some(message.to_string());
    }

    /// Make the next `commit_delivery` fail with a storage error.
    pub async fn fail_next_commit(&self, message: &str) {
        self.state.lock().await.fail_commit = Some(message.to_string());
    }

    /// All queue entries, in insertion order.
    pub async fn queue_entries(&self) -> Vec<QueueEntry> {
        self.state.lock().await.queue.clone()
    }

    /// Queue entries for one campaign, in insertion order.
    pub async fn campaign_entries(&self, campaign: &str) -> Vec<QueueEntry> {
        self.state
            .lock()
            .await
            .queue
            .iter()
            .filter(|e| e.campaign == campaign)
            .cloned()
            .collect()
    }

    pub async fn sent_records(&self) -> Vec<SentRecord> {
        self.state.lock().await.sent.clone()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn queued_identities(&self) -> Result<HashSet<String>, DealmailError> {
        let state = self.state.lock().await;
        Ok(state.queue.iter().map(|e| e.identity.clone()).collect())
    }

    async fn queue_tail(&self, campaign: &str) -> Result<Option<QueueTail>, DealmailError> {
        let state = self.state.lock().await;
        let latest = state
            .queue
            .iter()
            .filter(|e| e.campaign == campaign)
            .map(|e| e.scheduled_at)
            .max();
        Ok(latest.map(|latest| QueueTail {
            latest,
            at_latest: state
                .queue
                .iter()
                .filter(|e| e.campaign == campaign && e.scheduled_at == latest)
                .count() as u32,
        }))
    }

    async fn count_scheduled_between(
        &self,
        campaign: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u32, DealmailError> {
        let state = self.state.lock().await;
        let in_range = |at: DateTime<Utc>| at >= from && at <= to;
        let queued = state
            .queue
            .iter()
            .filter(|e| e.campaign == campaign && in_range(e.scheduled_at))
            .count();
        let sent = state
            .sent
            .iter()
            .filter(|r| r.campaign == campaign && r.scheduled_at.is_some_and(in_range))
            .count();
        Ok((queued + sent) as u32)
    }

    async fn insert_batch(&self, entries: &[NewQueueEntry]) -> Result<usize, DealmailError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.fail_insert.take() {
            return Err(DealmailError::storage(message));
        }
        for entry in entries {
            state.next_id += 1;
            let id = state.next_id;
            state.queue.push(QueueEntry {
                id,
                identity: entry.identity.clone(),
                campaign: entry.campaign.clone(),
                locale: entry.locale.clone(),
                display_name: entry.display_name.clone(),
                scheduled_at: entry.scheduled_at,
            });
        }
        Ok(entries.len())
    }

    async fn due_entries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, DealmailError> {
        let state = self.state.lock().await;
        let mut due: Vec<QueueEntry> = state
            .queue
            .iter()
            .filter(|e| e.scheduled_at < now)
            .cloned()
            .collect();
        due.sort_by_key(|e| (e.scheduled_at, e.id));
        due.truncate(limit);
        Ok(due)
    }

    async fn remove(&self, ids: &[i64]) -> Result<usize, DealmailError> {
        let mut state = self.state.lock().await;
        let before = state.queue.len();
        state.queue.retain(|e| !ids.contains(&e.id));
        Ok(before - state.queue.len())
    }

    async fn summary(
        &self,
        campaign: &str,
        now: DateTime<Utc>,
    ) -> Result<QueueSummary, DealmailError> {
        let state = self.state.lock().await;
        let entries = state.queue.iter().filter(|e| e.campaign == campaign);
        let mut summary = QueueSummary::default();
        for entry in entries {
            summary.queued += 1;
            if entry.scheduled_at < now {
                summary.due += 1;
            }
            summary.latest = summary.latest.max(Some(entry.scheduled_at));
        }
        Ok(summary)
    }
}

#[async_trait]
impl SentLedger for MemoryStore {
    async fn sent_identities(&self, campaign: &str) -> Result<HashSet<String>, DealmailError> {
        let state = self.state.lock().await;
        Ok(state
            .sent
            .iter()
            .filter(|r| r.campaign == campaign)
            .map(|r| r.identity.clone())
            .collect())
    }

    async fn append(&self, records: &[SentRecord]) -> Result<usize, DealmailError> {
        self.state.lock().await.sent.extend_from_slice(records);
        Ok(records.len())
    }

    async fn sent_count(&self, campaign: &str) -> Result<u64, DealmailError> {
        let state = self.state.lock().await;
        Ok(state.sent.iter().filter(|r| r.campaign == campaign).count() as u64)
    }
}

#[async_trait]
impl DeliveryStore for MemoryStore {
    async fn commit_delivery(
        &self,
        records: &[SentRecord],
        remove: &[i64],
    ) -> Result<usize, DealmailError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.fail_commit.take() {
            return Err(DealmailError::storage(message));
        }
        state.sent.extend_from_slice(records);
        let before = state.queue.len();
        state.queue.retain(|e| !remove.contains(&e.id));
        Ok(before - state.queue.len())
    }
}
