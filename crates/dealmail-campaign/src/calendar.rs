// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send days in the job's local timezone.
//!
//! A send day starts at the configured local send hour and lasts until the
//! next day's send hour. All scheduled instants are stored in UTC.

use chrono::{DateTime, Days, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use dealmail_config::model::JobConfig;
use dealmail_core::DealmailError;

/// Maps calendar dates to the UTC instant their send day starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendCalendar {
    timezone: Tz,
    send_hour: u32,
}

impl SendCalendar {
    pub fn new(timezone: Tz, send_hour: u32) -> Self {
        Self {
            timezone,
            send_hour: send_hour.min(23),
        }
    }

    pub fn from_config(config: &JobConfig) -> Result<Self, DealmailError> {
        let timezone = config.timezone.parse::<Tz>().map_err(|e| {
            DealmailError::Config(format!("job.timezone `{}`: {e}", config.timezone))
        })?;
        Ok(Self::new(timezone, config.send_hour))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The instant `date`'s send day starts.
    ///
    /// An ambiguous local time takes the earlier instant. A local time
    /// skipped by a DST change moves to the first valid hour after it.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        for hour in self.send_hour..24 {
            let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            match self.timezone.from_local_datetime(&naive) {
                LocalResult::Single(t) => return t.with_timezone(&Utc),
                LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
                LocalResult::None => continue,
            }
        }
        // No valid hour left in the day; fall back to UTC midnight of the next day.
        Utc.from_utc_datetime(&date.succ_opt().unwrap_or(date).and_time(chrono::NaiveTime::MIN))
    }

    /// The date of the send day containing `at`.
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        let date = at.with_timezone(&self.timezone).date_naive();
        if at >= self.day_start(date) {
            date
        } else {
            date.pred_opt().unwrap_or(date)
        }
    }

    /// The start of the send day after the one containing `at`.
    pub fn next_day_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        self.day_start(next_date(self.day_of(at)))
    }

    /// The send-hour instant on the local calendar day after `now`.
    ///
    /// Used for a fresh schedule so the first send is never sooner than tomorrow.
    pub fn tomorrow(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.timezone).date_naive();
        self.day_start(next_date(today))
    }
}

pub(crate) fn next_date(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helsinki() -> SendCalendar {
        SendCalendar::new("Europe/Helsinki".parse().unwrap(), 10)
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn day_start_is_local_send_hour() {
        let cal = helsinki();
        // EET is UTC+2 in winter, EEST UTC+3 in summer.
        assert_eq!(
            cal.day_start(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()),
            utc(2026, 1, 15, 8, 0)
        );
        assert_eq!(
            cal.day_start(NaiveDate::from_ymd_opt(2026, 7, 15).unwrap()),
            utc(2026, 7, 15, 7, 0)
        );
    }

    #[test]
    fn tomorrow_ignores_time_of_day() {
        let cal = helsinki();
        assert_eq!(cal.tomorrow(utc(2026, 1, 15, 6, 0)), utc(2026, 1, 16, 8, 0));
        assert_eq!(cal.tomorrow(utc(2026, 1, 15, 21, 30)), utc(2026, 1, 16, 8, 0));
    }

    #[test]
    fn early_morning_belongs_to_previous_send_day() {
        let cal = helsinki();
        let before_send_hour = utc(2026, 1, 16, 5, 0);
        assert_eq!(
            cal.day_of(before_send_hour),
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
        );
        assert_eq!(
            cal.day_of(utc(2026, 1, 16, 8, 0)),
            NaiveDate::from_ymd_opt(2026, 1, 16).unwrap()
        );
        assert_eq!(cal.next_day_start(before_send_hour), utc(2026, 1, 16, 8, 0));
    }

    #[test]
    fn skipped_local_hour_moves_forward() {
        // Helsinki springs forward from 03:00 to 04:00 on 2026-03-29.
        let cal = SendCalendar::new("Europe/Helsinki".parse().unwrap(), 3);
        let start = cal.day_start(NaiveDate::from_ymd_opt(2026, 3, 29).unwrap());
        assert_eq!(start, utc(2026, 3, 29, 1, 0));
    }

    #[test]
    fn from_config_rejects_unknown_zone() {
        let config = JobConfig {
            timezone: "Nowhere/Special".into(),
            ..JobConfig::default()
        };
        assert!(SendCalendar::from_config(&config).is_err());
    }
}
