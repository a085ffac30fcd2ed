// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dealmail schedule` command implementation.

use chrono::{DateTime, Utc};
use dealmail_campaign::{JobContext, ScheduleReport, schedule_all};
use dealmail_core::DealmailError;
use tracing::info;

/// Schedule every campaign, or just `campaign`, and print one line per campaign.
pub async fn run_schedule(
    ctx: &JobContext,
    campaign: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), DealmailError> {
    let reports = schedule_all(ctx, campaign, now).await?;
    for report in &reports {
        println!("{}", format_report(report));
    }
    info!(
        campaigns = reports.len(),
        inserted = reports.iter().map(|r| r.inserted).sum::<usize>(),
        "scheduling finished"
    );
    Ok(())
}

fn format_report(report: &ScheduleReport) -> String {
    let mut line = format!(
        "{}: queued {} of {} screened",
        report.campaign, report.inserted, report.screened
    );
    if let (Some(first), Some(last)) = (report.first_at, report.last_at) {
        line.push_str(&format!(
            " ({} .. {})",
            first.format("%Y-%m-%d %H:%M"),
            last.format("%Y-%m-%d %H:%M")
        ));
    }
    if !report.rejected.is_empty() {
        let reasons: Vec<String> = report
            .rejected
            .iter()
            .map(|(reason, n)| format!("{reason}={n}"))
            .collect();
        line.push_str(&format!(", rejected {}", reasons.join(" ")));
    }
    if report.missing > 0 {
        line.push_str(&format!(", {} without user record", report.missing));
    }
    line
}
