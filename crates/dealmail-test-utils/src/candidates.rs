// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate fixtures.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dealmail_core::{Candidate, CandidateSource, DealmailError};

/// Builds a candidate that passes the default eligibility rules at `now`.
///
/// Recently updated, registered long ago, paying through the App Store,
/// with a Finnish locale.
pub struct CandidateBuilder {
    candidate: Candidate,
}

impl CandidateBuilder {
    pub fn new(identity: &str, now: DateTime<Utc>) -> Self {
        Self {
            candidate: Candidate {
                identity: identity.to_string(),
                last_updated_at: now - TimeDelta::days(7),
                registered_at: Some(now - TimeDelta::days(365)),
                has_app_store_payment: true,
                has_play_store_payment: false,
                locale: Some("fi-FI".to_string()),
                display_name: Some("Test User".to_string()),
            },
        }
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.candidate.last_updated_at = at;
        self
    }

    pub fn registered_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.candidate.registered_at = at;
        self
    }

    pub fn payments(mut self, app_store: bool, play_store: bool) -> Self {
        self.candidate.has_app_store_payment = app_store;
        self.candidate.has_play_store_payment = play_store;
        self
    }

    pub fn locale(mut self, locale: Option<&str>) -> Self {
        self.candidate.locale = locale.map(str::to_string);
        self
    }

    pub fn display_name(mut self, name: Option<&str>) -> Self {
        self.candidate.display_name = name.map(str::to_string);
        self
    }

    pub fn build(self) -> Candidate {
        self.candidate
    }
}

/// `count` eligible candidates named `user-000@example.com` onwards.
pub fn eligible_candidates(count: usize, now: DateTime<Utc>) -> Vec<Candidate> {
    (0..count)
        .map(|i| CandidateBuilder::new(&format!("user-{i:03}@example.com"), now).build())
        .collect()
}

/// A fixed candidate list served in order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCandidates {
    candidates: Vec<Candidate>,
}

impl MemoryCandidates {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl CandidateSource for MemoryCandidates {
    async fn all(&self) -> Result<Vec<Candidate>, DealmailError> {
        Ok(self.candidates.clone())
    }

    async fn find(&self, identity: &str) -> Result<Option<Candidate>, DealmailError> {
        Ok(self
            .candidates
            .iter()
            .find(|c| c.identity == identity)
            .cloned())
    }
}
