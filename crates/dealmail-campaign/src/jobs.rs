// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scheduling job: screen an audience and queue it under the caps.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use dealmail_config::CampaignConfig;
use dealmail_core::{
    Audience, Candidate, DealmailError, ExclusionSets, NewQueueEntry, QueueStore, SentLedger,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::accumulator::QueueAccumulator;
use crate::banned::load_optional;
use crate::context::JobContext;
use crate::eligibility::{EligibilityPolicy, Rejection};
use crate::scheduler::{Scheduler, ThroughputPolicy, load_cursor};

/// Outcome of scheduling one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleReport {
    pub campaign: String,
    pub audience: Audience,
    /// Candidates looked at.
    pub screened: usize,
    pub inserted: usize,
    /// Rejections keyed by reason.
    pub rejected: BTreeMap<&'static str, usize>,
    /// Follow-up recipients with no record in the user feed.
    pub missing: usize,
    pub first_at: Option<DateTime<Utc>>,
    pub last_at: Option<DateTime<Utc>>,
}

impl ScheduleReport {
    fn new(campaign: &CampaignConfig) -> Self {
        Self {
            campaign: campaign.name.clone(),
            audience: campaign.audience,
            screened: 0,
            inserted: 0,
            rejected: BTreeMap::new(),
            missing: 0,
            first_at: None,
            last_at: None,
        }
    }

    fn reject(&mut self, reason: Rejection) {
        *self.rejected.entry(reason.into()).or_default() += 1;
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Schedule every configured campaign, or just `only` when given.
pub async fn schedule_all(
    ctx: &JobContext,
    only: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<ScheduleReport>, DealmailError> {
    let campaigns: Vec<&CampaignConfig> = match only {
        Some(name) => vec![
            ctx.config
                .campaign(name)
                .ok_or_else(|| DealmailError::Config(format!("unknown campaign `{name}`")))?,
        ],
        None => ctx.config.campaigns.iter().collect(),
    };
    if campaigns.is_empty() {
        warn!("no campaigns configured");
        return Ok(Vec::new());
    }

    let banned = ctx.banned()?;
    info!(banned = banned.len(), "banned list loaded");

    let mut reports = Vec::with_capacity(campaigns.len());
    for campaign in campaigns {
        reports.push(schedule_campaign(ctx, campaign, &banned, now).await?);
    }
    Ok(reports)
}

/// Screen one campaign's audience and queue the survivors.
///
/// Either every scheduled entry is inserted or, on error, none is.
pub async fn schedule_campaign(
    ctx: &JobContext,
    campaign: &CampaignConfig,
    banned: &HashSet<String>,
    now: DateTime<Utc>,
) -> Result<ScheduleReport, DealmailError> {
    let store = ctx.store.as_ref();
    let name = campaign.name.as_str();
    let mut report = ScheduleReport::new(campaign);

    let mut excluded = banned.clone();
    excluded.extend(load_optional(campaign.exclude_path.as_deref())?);
    let sent = ctx
        .retry
        .run("sent_identities", || store.sent_identities(name))
        .await?;
    let queued = ctx
        .retry
        .run("queued_identities", || store.queued_identities())
        .await?;
    info!(
        campaign = name,
        excluded = excluded.len(),
        sent = sent.len(),
        queued = queued.len(),
        "exclusion sets loaded"
    );
    let mut sets = ExclusionSets::new(excluded, sent, queued);

    let candidates = match campaign.audience {
        Audience::Users => ctx.candidates.all().await?,
        Audience::FollowUp => follow_up_candidates(ctx, campaign, &sets, &mut report).await?,
    };

    let cursor = ctx
        .retry
        .run("load_cursor", || load_cursor(store, name, &ctx.calendar))
        .await?;
    let mut scheduler = Scheduler::resume(
        ThroughputPolicy::from_campaign(campaign),
        ctx.calendar,
        cursor,
        now,
    );
    let eligibility = EligibilityPolicy::from_campaign(campaign);
    let mut accumulator = QueueAccumulator::new();

    for candidate in candidates {
        report.screened += 1;
        let verdict = match campaign.audience {
            Audience::Users => eligibility.check(&candidate, &sets, now),
            Audience::FollowUp if sets.contains(&candidate.identity) => Err(Rejection::Excluded),
            Audience::FollowUp => Ok(()),
        };
        if let Err(reason) = verdict {
            report.reject(reason);
            continue;
        }

        let scheduled_at = scheduler.assign();
        sets.mark_queued(&candidate.identity);
        accumulator.push(NewQueueEntry {
            identity: candidate.identity,
            campaign: name.to_string(),
            locale: candidate
                .locale
                .unwrap_or_else(|| campaign.default_locale.clone()),
            display_name: candidate
                .display_name
                .unwrap_or_else(|| campaign.default_display_name.clone()),
            scheduled_at,
        });
    }

    report.first_at = accumulator.entries().first().map(|e| e.scheduled_at);
    report.last_at = accumulator.entries().last().map(|e| e.scheduled_at);
    report.inserted = accumulator.flush(store, &ctx.retry, name).await?;

    info!(
        campaign = name,
        audience = %campaign.audience,
        screened = report.screened,
        inserted = report.inserted,
        rejected = report.rejected_total(),
        "campaign scheduled"
    );
    Ok(report)
}

/// Recipients of the source campaign that this campaign has not reached yet,
/// in identity order.
async fn follow_up_candidates(
    ctx: &JobContext,
    campaign: &CampaignConfig,
    sets: &ExclusionSets,
    report: &mut ScheduleReport,
) -> Result<Vec<Candidate>, DealmailError> {
    let source = campaign.follow_up_of.as_deref().ok_or_else(|| {
        DealmailError::Config(format!(
            "follow-up campaign `{}` has no follow_up_of",
            campaign.name
        ))
    })?;
    let store = ctx.store.as_ref();

    let mut identities: Vec<String> = ctx
        .retry
        .run("sent_identities", || store.sent_identities(source))
        .await?
        .into_iter()
        .collect();
    identities.sort();

    let mut candidates = Vec::new();
    for identity in identities {
        if sets.contains(&identity) {
            report.screened += 1;
            report.reject(Rejection::Excluded);
            continue;
        }
        match ctx.candidates.find(&identity).await? {
            Some(candidate) => candidates.push(candidate),
            None => {
                warn!(
                    campaign = %campaign.name,
                    identity = %identity,
                    "follow-up recipient has no user record, skipping"
                );
                report.missing += 1;
            }
        }
    }
    info!(
        campaign = %campaign.name,
        source,
        recipients = candidates.len(),
        "follow-up audience collected"
    );
    Ok(candidates)
}
