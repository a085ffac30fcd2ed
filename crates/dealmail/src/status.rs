// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dealmail status` command implementation.
//!
//! Reads queue and sent-ledger counts for every configured campaign.

use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use dealmail_campaign::JobContext;
use dealmail_core::{DealmailError, QueueStore, SentLedger};
use serde::Serialize;

/// One campaign's row in `--json` output.
#[derive(Debug, Serialize)]
pub struct CampaignStatus {
    pub campaign: String,
    pub queued: u64,
    pub due: u64,
    pub latest: Option<DateTime<Utc>>,
    pub sent: u64,
}

/// Run the `dealmail status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    ctx: &JobContext,
    json: bool,
    plain: bool,
    now: DateTime<Utc>,
) -> Result<(), DealmailError> {
    let mut rows = Vec::with_capacity(ctx.config.campaigns.len());
    for campaign in &ctx.config.campaigns {
        let summary = ctx.store.summary(&campaign.name, now).await?;
        let sent = ctx.store.sent_count(&campaign.name).await?;
        rows.push(CampaignStatus {
            campaign: campaign.name.clone(),
            queued: summary.queued,
            due: summary.due,
            latest: summary.latest,
            sent,
        });
    }

    if json {
        let body = serde_json::to_string_pretty(&rows)
            .map_err(|e| DealmailError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{body}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&rows, use_color);
    }
    Ok(())
}

fn print_status(rows: &[CampaignStatus], use_color: bool) {
    println!();
    println!("  dealmail status");
    println!("  {}", "-".repeat(35));

    if rows.is_empty() {
        println!("    no campaigns configured");
    }
    for row in rows {
        let latest = row
            .latest
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        if use_color && row.due > 0 {
            use colored::Colorize;
            println!(
                "    {:<20} queued {:>6}  due {:>6}  sent {:>6}  latest {}",
                row.campaign,
                row.queued,
                row.due.to_string().yellow(),
                row.sent,
                latest
            );
        } else {
            println!(
                "    {:<20} queued {:>6}  due {:>6}  sent {:>6}  latest {}",
                row.campaign, row.queued, row.due, row.sent, latest
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_row_serializes() {
        let row = CampaignStatus {
            campaign: "yearly".to_string(),
            queued: 12,
            due: 3,
            latest: None,
            sent: 40,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"campaign\":\"yearly\""));
        assert!(json.contains("\"due\":3"));
        assert!(json.contains("\"latest\":null"));
    }
}
