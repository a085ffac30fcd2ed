// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Dealmail campaign job.
//!
//! Holds the domain types the pipeline passes between its stages, the
//! collaborator traits for the user feed, queue, sent-ledger and mail
//! transport, the shared error type, and the retry policy wrapped around
//! individual store and transport calls.

pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::DealmailError;
pub use retry::RetryPolicy;
pub use traits::{CandidateSource, DeliveryStore, MailTransport, QueueStore, SentLedger};
pub use types::{
    Audience, Candidate, DeliveryReceipt, ExclusionSets, NewQueueEntry, OutboundMail, QueueEntry,
    QueueSummary, QueueTail, ScheduleCursor, SendAttempt, SendOutcome, SentRecord,
    UnsubscribeGroup, ACCEPTED_STATUS,
};
