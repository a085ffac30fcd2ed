// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as timezone names, throughput caps, and cross-campaign references.

use std::collections::HashSet;

use dealmail_core::Audience;

use crate::diagnostic::ConfigError;
use crate::model::{CampaignConfig, DealmailConfig};

/// Longest span, in hours, a day bucket may cover. One hour short of a day
/// so a DST-shortened day still ends before the next send hour.
const MAX_DAY_SPAN_HOURS: u64 = 23;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every error instead of failing fast.
pub fn validate_config(config: &DealmailConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.job.timezone.parse::<chrono_tz::Tz>().is_err() {
        errors.push(ConfigError::validation(format!(
            "job.timezone `{}` is not a known IANA timezone",
            config.job.timezone
        )));
    }

    if config.job.send_hour > 23 {
        errors.push(ConfigError::validation(format!(
            "job.send_hour must be between 0 and 23, got {}",
            config.job.send_hour
        )));
    }

    if config.retry.max_attempts == 0 {
        errors.push(ConfigError::validation("retry.max_attempts must be at least 1"));
    }

    if config.dispatch.batch_limit == 0 {
        errors.push(ConfigError::validation(
            "dispatch.batch_limit must be at least 1",
        ));
    }

    if !config.mail.languages.contains(&config.mail.default_language) {
        errors.push(ConfigError::validation(format!(
            "mail.default_language `{}` is not listed in mail.languages",
            config.mail.default_language
        )));
    }

    let mut names = HashSet::new();
    for campaign in &config.campaigns {
        if !names.insert(campaign.name.as_str()) {
            errors.push(ConfigError::validation(format!(
                "campaign name `{}` is used more than once",
                campaign.name
            )));
        }
        validate_campaign(config, campaign, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_campaign(
    config: &DealmailConfig,
    campaign: &CampaignConfig,
    errors: &mut Vec<ConfigError>,
) {
    let name = &campaign.name;

    if name.trim().is_empty() {
        errors.push(ConfigError::validation("campaign name must not be empty"));
    }

    if campaign.price_id.trim().is_empty() {
        errors.push(ConfigError::validation(format!(
            "campaign `{name}`: price_id must not be empty"
        )));
    }

    if !config.mail.templates.contains_key(&campaign.template_key) {
        errors.push(ConfigError::validation(format!(
            "campaign `{name}`: template_key `{}` has no entry in mail.templates",
            campaign.template_key
        )));
    }

    if campaign.max_per_day == 0 || campaign.max_per_hour == 0 {
        errors.push(ConfigError::validation(format!(
            "campaign `{name}`: max_per_day and max_per_hour must be at least 1"
        )));
    } else if campaign.max_per_hour > campaign.max_per_day {
        errors.push(ConfigError::validation(format!(
            "campaign `{name}`: max_per_hour ({}) exceeds max_per_day ({})",
            campaign.max_per_hour, campaign.max_per_day
        )));
    } else {
        let buckets = campaign.max_per_day.div_ceil(campaign.max_per_hour) as u64;
        let span = (buckets - 1) * campaign.hour_gap_hours as u64;
        if span >= MAX_DAY_SPAN_HOURS {
            errors.push(ConfigError::validation(format!(
                "campaign `{name}`: {buckets} hour buckets {} hours apart span {span} hours, \
                 which reaches the next send day; raise max_per_hour or lower hour_gap_hours",
                campaign.hour_gap_hours
            )));
        }
    }

    if campaign.hour_gap_hours == 0 {
        errors.push(ConfigError::validation(format!(
            "campaign `{name}`: hour_gap_hours must be at least 1"
        )));
    }

    match (campaign.audience, campaign.follow_up_of.as_deref()) {
        (Audience::FollowUp, None) => {
            errors.push(ConfigError::validation(format!(
                "campaign `{name}`: audience `follow_up` requires follow_up_of"
            )));
        }
        (Audience::FollowUp, Some(source)) => {
            let valid_source = config
                .campaign(source)
                .is_some_and(|c| c.audience == Audience::Users && c.name != *name);
            if !valid_source {
                errors.push(ConfigError::validation(format!(
                    "campaign `{name}`: follow_up_of `{source}` must name another campaign \
                     with audience `users`"
                )));
            }
        }
        (Audience::Users, Some(_)) => {
            errors.push(ConfigError::validation(format!(
                "campaign `{name}`: follow_up_of is only valid with audience `follow_up`"
            )));
        }
        (Audience::Users, None) => {}
    }
}
