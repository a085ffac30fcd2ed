// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-invocation job context.
//!
//! Built once per command from the loaded configuration and the opened
//! collaborators, then passed by reference to each job.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dealmail_config::DealmailConfig;
use dealmail_core::{CandidateSource, DealmailError, DeliveryStore, MailTransport, RetryPolicy};
use dealmail_mailer::MailComposer;

use crate::banned::load_optional;
use crate::calendar::SendCalendar;

/// Everything a job needs, with no process-wide state.
pub struct JobContext {
    pub config: DealmailConfig,
    pub store: Arc<dyn DeliveryStore>,
    pub candidates: Arc<dyn CandidateSource>,
    pub calendar: SendCalendar,
    pub retry: RetryPolicy,
    pub composer: MailComposer,
    transport: Option<Arc<dyn MailTransport>>,
}

impl JobContext {
    pub fn new(
        config: DealmailConfig,
        store: Arc<dyn DeliveryStore>,
        candidates: Arc<dyn CandidateSource>,
    ) -> Result<Self, DealmailError> {
        let calendar = SendCalendar::from_config(&config.job)?;
        let retry = RetryPolicy::new(
            config.retry.max_attempts,
            Duration::from_millis(config.retry.backoff_ms),
        );
        let composer = MailComposer::from_config(&config);
        Ok(Self {
            config,
            store,
            candidates,
            calendar,
            retry,
            composer,
            transport: None,
        })
    }

    /// Attach the mail transport used by dispatch.
    pub fn with_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn transport(&self) -> Result<&dyn MailTransport, DealmailError> {
        self.transport
            .as_deref()
            .ok_or_else(|| DealmailError::Config("no mail transport configured".to_string()))
    }

    /// The banned-address list, read fresh from its file.
    pub fn banned(&self) -> Result<HashSet<String>, DealmailError> {
        load_optional(self.config.banned.path.as_deref())
    }

    /// Release the store's connections.
    pub async fn close(&self) -> Result<(), DealmailError> {
        self.store.close().await
    }
}
