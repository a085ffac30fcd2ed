// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the queue and sent-ledger traits.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use dealmail_config::model::StorageConfig;
use dealmail_core::{
    DealmailError, DeliveryStore, NewQueueEntry, QueueEntry, QueueStore, QueueSummary, QueueTail,
    SentLedger, SentRecord,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed queue and ledger.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the configured database, creating and migrating it if needed.
    pub async fn open(config: &StorageConfig) -> Result<Self, DealmailError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    /// Wrap an already opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl QueueStore for SqliteStore {
    async fn queued_identities(&self) -> Result<HashSet<String>, DealmailError> {
        queries::queue::queued_identities(&self.db).await
    }

    async fn queue_tail(&self, campaign: &str) -> Result<Option<QueueTail>, DealmailError> {
        queries::queue::queue_tail(&self.db, campaign).await
    }

    async fn count_scheduled_between(
        &self,
        campaign: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u32, DealmailError> {
        queries::queue::count_scheduled_between(&self.db, campaign, from, until).await
    }

    async fn insert_batch(&self, entries: &[NewQueueEntry]) -> Result<usize, DealmailError> {
        queries::queue::insert_batch(&self.db, entries).await
    }

    async fn due_entries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, DealmailError> {
        queries::queue::due_entries(&self.db, now, limit).await
    }

    async fn remove(&self, ids: &[i64]) -> Result<usize, DealmailError> {
        queries::queue::remove(&self.db, ids).await
    }

    async fn summary(
        &self,
        campaign: &str,
        now: DateTime<Utc>,
    ) -> Result<QueueSummary, DealmailError> {
        queries::queue::summary(&self.db, campaign, now).await
    }
}

#[async_trait]
impl SentLedger for SqliteStore {
    async fn sent_identities(&self, campaign: &str) -> Result<HashSet<String>, DealmailError> {
        queries::sent::sent_identities(&self.db, campaign).await
    }

    async fn append(&self, records: &[SentRecord]) -> Result<usize, DealmailError> {
        queries::sent::append(&self.db, records).await
    }

    async fn sent_count(&self, campaign: &str) -> Result<u64, DealmailError> {
        queries::sent::sent_count(&self.db, campaign).await
    }
}

#[async_trait]
impl DeliveryStore for SqliteStore {
    async fn commit_delivery(
        &self,
        records: &[SentRecord],
        remove_ids: &[i64],
    ) -> Result<usize, DealmailError> {
        queries::sent::commit_delivery(&self.db, records, remove_ids).await
    }

    async fn close(&self) -> Result<(), DealmailError> {
        self.db.close().await
    }
}
