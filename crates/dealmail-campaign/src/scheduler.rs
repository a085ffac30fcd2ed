// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send-time assignment under daily and hourly throughput caps.
//!
//! Sends are grouped into hour slots of at most `max_per_hour` entries that
//! share one instant, spaced `hour_gap` apart, and into send days of at most
//! `max_per_day` entries. A send day starts at the local send hour (see
//! [`SendCalendar`]). The position in the current slot and day is never
//! stored: [`load_cursor`] recomputes it from the queue at the start of each
//! run, so a run that schedules N1 then a run that schedules N2 candidates
//! produce the same times as one run with N1+N2.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use dealmail_config::CampaignConfig;
use dealmail_core::{DealmailError, QueueStore, ScheduleCursor};
use tracing::debug;

use crate::calendar::{SendCalendar, next_date};

/// Daily and hourly caps for one campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputPolicy {
    max_per_day: u32,
    max_per_hour: u32,
    hour_gap: TimeDelta,
}

impl ThroughputPolicy {
    /// Caps below one are raised to one.
    pub fn new(max_per_day: u32, max_per_hour: u32, hour_gap_hours: u32) -> Self {
        Self {
            max_per_day: max_per_day.max(1),
            max_per_hour: max_per_hour.max(1),
            hour_gap: TimeDelta::hours(i64::from(hour_gap_hours.max(1))),
        }
    }

    pub fn from_campaign(campaign: &CampaignConfig) -> Self {
        Self::new(
            campaign.max_per_day,
            campaign.max_per_hour,
            campaign.hour_gap_hours,
        )
    }

    pub fn max_per_day(&self) -> u32 {
        self.max_per_day
    }

    pub fn max_per_hour(&self) -> u32 {
        self.max_per_hour
    }
}

/// Read the scheduling position of `campaign` from the queue.
pub async fn load_cursor(
    store: &dyn QueueStore,
    campaign: &str,
    calendar: &SendCalendar,
) -> Result<ScheduleCursor, DealmailError> {
    let Some(tail) = store.queue_tail(campaign).await? else {
        return Ok(ScheduleCursor::default());
    };

    let day_start = calendar.day_start(calendar.day_of(tail.latest));
    let in_day_bucket = store
        .count_scheduled_between(campaign, day_start, tail.latest)
        .await?;

    Ok(ScheduleCursor {
        latest: Some(tail.latest),
        at_latest: tail.at_latest,
        in_day_bucket,
    })
}

/// Assigns send times one candidate at a time.
#[derive(Debug, Clone)]
pub struct Scheduler {
    policy: ThroughputPolicy,
    calendar: SendCalendar,
    next: DateTime<Utc>,
    day: NaiveDate,
    in_day: u32,
    in_hour: u32,
}

impl Scheduler {
    /// Continue from `cursor`, or start tomorrow when there is nothing to continue.
    ///
    /// A position that already lies before `now` is abandoned for a fresh
    /// day starting tomorrow.
    pub fn resume(
        policy: ThroughputPolicy,
        calendar: SendCalendar,
        cursor: ScheduleCursor,
        now: DateTime<Utc>,
    ) -> Self {
        let fresh = || {
            let start = calendar.tomorrow(now);
            Self {
                policy,
                calendar,
                next: start,
                day: calendar.day_of(start),
                in_day: 0,
                in_hour: 0,
            }
        };

        let Some(latest) = cursor.latest else {
            return fresh();
        };

        let mut scheduler = Self {
            policy,
            calendar,
            next: latest,
            day: calendar.day_of(latest),
            in_day: cursor.in_day_bucket,
            in_hour: cursor.at_latest,
        };
        scheduler.advance();

        if scheduler.next < now {
            debug!(latest = %latest, now = %now, "queue tail is in the past, starting tomorrow");
            return fresh();
        }
        scheduler
    }

    /// The instant the next candidate would receive.
    pub fn peek(&self) -> DateTime<Utc> {
        self.next
    }

    /// Assign the current slot and move past it.
    pub fn assign(&mut self) -> DateTime<Utc> {
        let at = self.next;
        self.in_day += 1;
        self.in_hour += 1;
        self.advance();
        at
    }

    /// Close a full hour slot, then a full or overrun day. The day check runs
    /// last so its reset to the send hour wins.
    fn advance(&mut self) {
        if self.in_hour >= self.policy.max_per_hour {
            self.next += self.policy.hour_gap;
            self.in_hour = 0;
        }

        let day_end = self.calendar.day_start(next_date(self.day));
        if self.in_day >= self.policy.max_per_day || self.next >= day_end {
            self.day = next_date(self.day);
            self.next = day_end;
            self.in_day = 0;
            self.in_hour = 0;
        }
    }
}
