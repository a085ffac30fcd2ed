// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the edges of the campaign job.
//!
//! All traits use `#[async_trait]` so the job can hold them as trait objects
//! inside its context.

pub mod candidates;
pub mod ledger;
pub mod queue;
pub mod transport;

pub use candidates::CandidateSource;
pub use ledger::{DeliveryStore, SentLedger};
pub use queue::QueueStore;
pub use transport::MailTransport;
