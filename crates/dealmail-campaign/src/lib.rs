// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The campaign pipeline.
//!
//! Scheduling screens an audience with the [`eligibility`] predicate,
//! assigns send times with the [`scheduler`], and writes the pass through a
//! [`QueueAccumulator`]. Dispatch sends due entries and [`reconcile`]s the
//! settled batch against the queue and the sent ledger.

pub mod accumulator;
pub mod banned;
pub mod calendar;
pub mod context;
pub mod dispatch;
pub mod eligibility;
pub mod feed;
pub mod jobs;
pub mod reconcile;
pub mod scheduler;

pub use accumulator::QueueAccumulator;
pub use calendar::SendCalendar;
pub use context::JobContext;
pub use dispatch::{DispatchFailure, DispatchReport, dispatch_due, drain, preview_due};
pub use eligibility::{EligibilityPolicy, Rejection};
pub use feed::JsonlCandidateSource;
pub use jobs::{ScheduleReport, schedule_all, schedule_campaign};
pub use reconcile::{Reconciliation, reconcile};
pub use scheduler::{Scheduler, ThroughputPolicy, load_cursor};
