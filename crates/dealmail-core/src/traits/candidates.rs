// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only source of candidate user records.

use async_trait::async_trait;

use crate::error::DealmailError;
use crate::types::Candidate;

/// Provides the projected user feed the eligibility filter screens.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Every candidate in the feed, in source order.
    async fn all(&self) -> Result<Vec<Candidate>, DealmailError>;

    /// Look up a single candidate by identity.
    async fn find(&self, identity: &str) -> Result<Option<Candidate>, DealmailError>;
}
