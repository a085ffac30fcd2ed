// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dealmail dispatch` command implementation.

use chrono::{DateTime, Utc};
use dealmail_campaign::{JobContext, dispatch_due, drain, preview_due};
use dealmail_core::DealmailError;

/// Send due entries once, or until drained. A partial batch is an error so
/// the process exits with a distinct status.
pub async fn run_dispatch(
    ctx: &JobContext,
    drain_all: bool,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Result<(), DealmailError> {
    if dry_run {
        let due = preview_due(ctx, now).await?;
        for entry in &due {
            println!(
                "{}  {}  {}  {}",
                entry.scheduled_at.format("%Y-%m-%d %H:%M"),
                entry.campaign,
                entry.locale,
                entry.identity
            );
        }
        println!("{} due", due.len());
        return Ok(());
    }

    let report = if drain_all {
        drain(ctx, now).await?
    } else {
        dispatch_due(ctx, now).await?
    };

    println!(
        "dispatched: {} confirmed of {} attempted in {} batch(es), {} pruned",
        report.confirmed, report.attempted, report.batches, report.pruned
    );
    for failure in &report.failures {
        println!(
            "  not sent: {} ({}): {}",
            failure.identity, failure.campaign, failure.reason
        );
    }
    report.ensure_complete()
}
