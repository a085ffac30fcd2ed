// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only ledger of confirmed sends.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::DealmailError;
use crate::traits::queue::QueueStore;
use crate::types::SentRecord;

/// The permanent "do not contact again" record per campaign.
///
/// Records are never mutated or deleted.
#[async_trait]
pub trait SentLedger: Send + Sync {
    /// Identities with a confirmed send for `campaign`.
    async fn sent_identities(&self, campaign: &str) -> Result<HashSet<String>, DealmailError>;

    /// Append records. Returns the appended count.
    async fn append(&self, records: &[SentRecord]) -> Result<usize, DealmailError>;

    /// Number of confirmed sends for `campaign`.
    async fn sent_count(&self, campaign: &str) -> Result<u64, DealmailError>;
}

/// A store that owns both the queue and the ledger.
#[async_trait]
pub trait DeliveryStore: QueueStore + SentLedger {
    /// Append the ledger records, then remove the confirmed queue entries.
    ///
    /// The ledger write always lands before the queue delete. Stores that
    /// can do both in one transaction should override this.
    async fn commit_delivery(
        &self,
        records: &[SentRecord],
        remove_ids: &[i64],
    ) -> Result<usize, DealmailError> {
        self.append(records).await?;
        self.remove(remove_ids).await
    }

    /// Release held connections.
    async fn close(&self) -> Result<(), DealmailError> {
        Ok(())
    }
}
