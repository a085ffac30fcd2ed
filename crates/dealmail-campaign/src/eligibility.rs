// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign eligibility predicate over candidate records.

use chrono::{DateTime, Months, TimeDelta, Utc};
use dealmail_config::{CampaignConfig, MissingRegistration, RegistrationRule};
use dealmail_core::{Candidate, ExclusionSets};
use strum::{Display, IntoStaticStr};

/// Why a candidate was left out of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    /// Banned, already sent, or already queued.
    Excluded,
    /// Not updated within the recency window.
    Stale,
    /// Registration age falls on the wrong side of the window.
    Registration,
    /// Neither an App Store nor a Play Store payment.
    NoPayment,
    /// Locale present but outside the target prefix.
    Locale,
}

/// Inclusion rules for one campaign.
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    recency: Months,
    registration_window: TimeDelta,
    registration_rule: RegistrationRule,
    missing_registration: MissingRegistration,
    target_locale_prefix: String,
}

impl EligibilityPolicy {
    pub fn new(
        recency_months: u32,
        registration_window_days: u32,
        registration_rule: RegistrationRule,
        missing_registration: MissingRegistration,
        target_locale_prefix: &str,
    ) -> Self {
        Self {
            recency: Months::new(recency_months),
            registration_window: TimeDelta::days(i64::from(registration_window_days)),
            registration_rule,
            missing_registration,
            target_locale_prefix: target_locale_prefix.to_lowercase(),
        }
    }

    pub fn from_campaign(campaign: &CampaignConfig) -> Self {
        Self::new(
            campaign.recency_months,
            campaign.registration_window_days,
            campaign.registration_rule,
            campaign.missing_registration,
            &campaign.target_locale_prefix,
        )
    }

    /// `true` when the candidate passes every check.
    pub fn is_eligible(&self, candidate: &Candidate, sets: &ExclusionSets, now: DateTime<Utc>) -> bool {
        self.check(candidate, sets, now).is_ok()
    }

    /// Run every check in turn, returning the first one that fails.
    pub fn check(
        &self,
        candidate: &Candidate,
        sets: &ExclusionSets,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        if sets.contains(&candidate.identity) {
            return Err(Rejection::Excluded);
        }

        let updated_since = now.checked_sub_months(self.recency).unwrap_or(now);
        if candidate.last_updated_at < updated_since {
            return Err(Rejection::Stale);
        }

        if !self.registration_ok(candidate.registered_at, now) {
            return Err(Rejection::Registration);
        }

        if !candidate.has_app_store_payment && !candidate.has_play_store_payment {
            return Err(Rejection::NoPayment);
        }

        if let Some(locale) = &candidate.locale
            && !locale.trim().to_lowercase().starts_with(&self.target_locale_prefix)
        {
            return Err(Rejection::Locale);
        }

        Ok(())
    }

    fn registration_ok(&self, registered_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(registered_at) = registered_at else {
            return self.missing_registration == MissingRegistration::Include;
        };
        let recent = registered_at >= now - self.registration_window;
        match self.registration_rule {
            RegistrationRule::ExcludeRecent => !recent,
            RegistrationRule::RequireRecent => recent,
        }
    }
}
