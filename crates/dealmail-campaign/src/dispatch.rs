// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch of due queue entries.
//!
//! A batch is read once, every entry is sent concurrently, and the batch is
//! reconciled only after every send has settled. Confirmed sends are written
//! to the ledger and removed from the queue in one commit; everything else
//! stays queued for the next run.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use dealmail_core::{
    DealmailError, MailTransport, QueueEntry, QueueStore, SendAttempt, SendOutcome, SentLedger,
};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::JobContext;
use crate::reconcile::reconcile;

/// One unconfirmed send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFailure {
    pub identity: String,
    pub campaign: String,
    pub reason: String,
}

/// Totals for one batch, or for a drain of several.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub batches: usize,
    /// Sends issued to the transport or failed while preparing them.
    pub attempted: usize,
    pub confirmed: usize,
    /// Due entries already in the ledger, removed without sending.
    pub pruned: usize,
    /// Whether the last batch hit the batch limit.
    pub batch_full: bool,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_partial(&self) -> bool {
        self.confirmed < self.attempted
    }

    /// Fold a later batch into a running total.
    pub fn merge(&mut self, other: DispatchReport) {
        self.batches += other.batches;
        self.attempted += other.attempted;
        self.confirmed += other.confirmed;
        self.pruned += other.pruned;
        self.batch_full = other.batch_full;
        self.failures.extend(other.failures);
    }

    /// A `PartialDelivery` error when some sends were not confirmed.
    pub fn ensure_complete(&self) -> Result<(), DealmailError> {
        if self.is_partial() {
            return Err(DealmailError::PartialDelivery {
                confirmed: self.confirmed,
                attempted: self.attempted,
            });
        }
        Ok(())
    }
}

/// Entries that a dispatch at `now` would pick up, without sending.
pub async fn preview_due(
    ctx: &JobContext,
    now: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, DealmailError> {
    let store = ctx.store.as_ref();
    let limit = ctx.config.dispatch.batch_limit;
    ctx.retry
        .run("due_entries", || store.due_entries(now, limit))
        .await
}

/// Send one batch of entries due before `now`.
pub async fn dispatch_due(
    ctx: &JobContext,
    now: DateTime<Utc>,
) -> Result<DispatchReport, DealmailError> {
    let transport = ctx.transport()?;
    let store = ctx.store.as_ref();
    let limit = ctx.config.dispatch.batch_limit;

    let due = ctx
        .retry
        .run("due_entries", || store.due_entries(now, limit))
        .await
        .inspect_err(|e| error!(error = %e, "reading due entries failed"))?;

    let mut report = DispatchReport {
        batches: 1,
        batch_full: due.len() >= limit,
        ..DispatchReport::default()
    };
    if due.is_empty() {
        info!("no due queue entries");
        return Ok(report);
    }

    let (fresh, already_sent) = split_already_sent(ctx, due).await?;
    if !already_sent.is_empty() {
        report.pruned = ctx
            .retry
            .run("remove", || store.remove(&already_sent))
            .await
            .inspect_err(|e| error!(error = %e, "pruning already-sent entries failed"))?;
        warn!(
            pruned = report.pruned,
            "removed due entries that were already in the sent ledger"
        );
    }

    let attempts = join_all(fresh.iter().map(|entry| send_one(ctx, transport, entry))).await;
    let reconciliation = reconcile(&fresh, &attempts, now);

    if !reconciliation.to_remove.is_empty() {
        ctx.retry
            .run("commit_delivery", || {
                store.commit_delivery(&reconciliation.records, &reconciliation.to_remove)
            })
            .await
            .inspect_err(|e| error!(error = %e, "recording confirmed sends failed"))?;
    }

    report.attempted = attempts.len();
    report.confirmed = reconciliation.confirmed();
    report.failures = failures(&fresh, &attempts);

    for failure in &report.failures {
        warn!(
            identity = %failure.identity,
            campaign = %failure.campaign,
            reason = %failure.reason,
            "send not confirmed, entry stays queued"
        );
    }
    if report.is_partial() {
        warn!(
            confirmed = report.confirmed,
            attempted = report.attempted,
            "partial delivery"
        );
    } else {
        info!(
            confirmed = report.confirmed,
            transport = transport.name(),
            "dispatch batch delivered"
        );
    }

    Ok(report)
}

/// Dispatch batches until one is not full or not fully confirmed.
pub async fn drain(ctx: &JobContext, now: DateTime<Utc>) -> Result<DispatchReport, DealmailError> {
    let mut total = DispatchReport::default();
    loop {
        let report = dispatch_due(ctx, now).await?;
        let more = report.batch_full && !report.is_partial();
        total.merge(report);
        if !more {
            break;
        }
    }
    info!(
        batches = total.batches,
        confirmed = total.confirmed,
        attempted = total.attempted,
        pruned = total.pruned,
        "dispatch drained"
    );
    Ok(total)
}

/// Separate entries whose identity already has a ledger record for the same campaign.
async fn split_already_sent(
    ctx: &JobContext,
    due: Vec<QueueEntry>,
) -> Result<(Vec<QueueEntry>, Vec<i64>), DealmailError> {
    let store = ctx.store.as_ref();
    let campaigns: HashSet<&str> = due.iter().map(|e| e.campaign.as_str()).collect();

    let mut sent: HashMap<String, HashSet<String>> = HashMap::new();
    for campaign in campaigns {
        let identities = ctx
            .retry
            .run("sent_identities", || store.sent_identities(campaign))
            .await?;
        sent.insert(campaign.to_string(), identities);
    }

    let (already, fresh): (Vec<_>, Vec<_>) = due.into_iter().partition(|entry| {
        sent.get(&entry.campaign)
            .is_some_and(|ids| ids.contains(&entry.identity))
    });
    Ok((fresh, already.into_iter().map(|e| e.id).collect()))
}

/// Compose and send one entry. Never fails the batch.
async fn send_one(ctx: &JobContext, transport: &dyn MailTransport, entry: &QueueEntry) -> SendAttempt {
    let outcome = match ctx.config.campaign(&entry.campaign) {
        None => SendOutcome::Failed(format!("unknown campaign `{}`", entry.campaign)),
        Some(campaign) => {
            match ctx
                .composer
                .compose(entry, &campaign.template_key, &campaign.price_id)
            {
                Err(e) => SendOutcome::Failed(e.to_string()),
                Ok(mail) => match transport.send(&mail).await {
                    Ok(receipt) => SendOutcome::Receipt(receipt),
                    Err(e) => SendOutcome::Failed(e.to_string()),
                },
            }
        }
    };
    SendAttempt {
        entry_id: entry.id,
        outcome,
    }
}

fn failures(entries: &[QueueEntry], attempts: &[SendAttempt]) -> Vec<DispatchFailure> {
    let by_id: HashMap<i64, &QueueEntry> = entries.iter().map(|e| (e.id, e)).collect();
    attempts
        .iter()
        .filter(|attempt| !attempt.outcome.is_confirmed())
        .filter_map(|attempt| {
            let entry = by_id.get(&attempt.entry_id)?;
            let reason = match &attempt.outcome {
                SendOutcome::Failed(reason) => reason.clone(),
                SendOutcome::Receipt(receipt) => match receipt.status {
                    Some(status) => format!("provider answered {status}"),
                    None => "provider answered without a status".to_string(),
                },
            };
            Some(DispatchFailure {
                identity: entry.identity.clone(),
                campaign: entry.campaign.clone(),
                reason,
            })
        })
        .collect()
}
