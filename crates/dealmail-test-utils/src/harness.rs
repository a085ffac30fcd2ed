// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end job tests.
//!
//! `TestHarness` assembles a temp SQLite store, a mock transport, and a
//! candidate list around a configuration with one campaign and a full
//! template table.

use std::collections::BTreeMap;
use std::sync::Arc;

use dealmail_config::model::{CampaignConfig, DealmailConfig, StorageConfig};
use dealmail_core::{Candidate, DealmailError};
use dealmail_storage::SqliteStore;

use crate::candidates::MemoryCandidates;
use crate::mock_transport::MockTransport;

/// Name of the campaign in [`test_config`].
pub const TEST_CAMPAIGN: &str = "yearly";

/// Price id of the campaign in [`test_config`].
pub const TEST_PRICE: &str = "price_yearly";

/// A valid configuration with one `users` campaign in UTC.
pub fn test_config() -> DealmailConfig {
    let mut config = DealmailConfig::default();
    config.job.timezone = "UTC".to_string();
    config.job.send_hour = 10;
    config.retry.backoff_ms = 0;
    config.mail.sender_address = "deals@example.com".to_string();
    config.mail.unsubscribe_group_id = 42;
    config.mail.unsubscribe_group_ids = vec![42];
    config.checkout.base_url = "https://shop.example.com".to_string();
    config.mail.templates.insert(
        "yearlyDeal".to_string(),
        BTreeMap::from([
            ("fi".to_string(), "d-yearly-fi".to_string()),
            ("en".to_string(), "d-yearly-en".to_string()),
            ("sv".to_string(), "d-yearly-sv".to_string()),
        ]),
    );
    config
        .campaigns
        .push(CampaignConfig::new(TEST_CAMPAIGN, "yearlyDeal", TEST_PRICE));
    config
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: DealmailConfig,
    candidates: Vec<Candidate>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: test_config(),
            candidates: Vec::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: DealmailConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjust the test configuration in place.
    pub fn configure(mut self, edit: impl FnOnce(&mut DealmailConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Build the harness. The database lives in a temp directory owned by the harness.
    pub async fn build(mut self) -> Result<TestHarness, DealmailError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| DealmailError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("dealmail.db");
        self.config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::open(&self.config.storage).await?);

        Ok(TestHarness {
            config: self.config,
            store,
            transport: Arc::new(MockTransport::new()),
            candidates: Arc::new(MemoryCandidates::new(self.candidates)),
            temp_dir,
        })
    }
}

/// A temp store, a mock transport, and a candidate list.
pub struct TestHarness {
    pub config: DealmailConfig,
    pub store: Arc<SqliteStore>,
    pub transport: Arc<MockTransport>,
    pub candidates: Arc<MemoryCandidates>,
    temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Directory for extra input files such as banned lists.
    pub fn dir(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Write `content` to a file in the harness directory and return its path.
    pub fn write_file(&self, name: &str, content: &str) -> Result<String, DealmailError> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).map_err(|e| DealmailError::Input {
            message: format!("writing {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Ok(path.to_string_lossy().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealmail_core::QueueStore;

    #[tokio::test]
    async fn harness_opens_an_empty_store() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert!(harness.store.queued_identities().await.unwrap().is_empty());
        assert!(harness.config.campaign(TEST_CAMPAIGN).is_some());
    }

    #[tokio::test]
    async fn files_land_in_the_harness_directory() {
        let harness = TestHarness::builder().build().await.unwrap();
        let path = harness.write_file("banned.csv", "a@example.com\n").unwrap();
        assert!(path.starts_with(harness.dir().to_string_lossy().as_ref()));
    }
}
