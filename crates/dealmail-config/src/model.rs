// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Dealmail campaign job.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use dealmail_core::Audience;
use serde::{Deserialize, Serialize};

/// Top-level Dealmail configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DealmailConfig {
    /// Logging and calendar settings shared by every job.
    #[serde(default)]
    pub job: JobConfig,

    /// Queue and sent-ledger database.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry policy around individual store and transport calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Dispatch batch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Mail provider settings and template ids.
    #[serde(default)]
    pub mail: MailConfig,

    /// Checkout link settings.
    #[serde(default)]
    pub checkout: CheckoutConfig,

    /// Banned-address list.
    #[serde(default)]
    pub banned: BannedConfig,

    /// Candidate feed location.
    #[serde(default)]
    pub input: InputConfig,

    /// One entry per campaign variant.
    #[serde(default)]
    pub campaigns: Vec<CampaignConfig>,
}

impl DealmailConfig {
    /// Find a campaign by name.
    pub fn campaign(&self, name: &str) -> Option<&CampaignConfig> {
        self.campaigns.iter().find(|c| c.name == name)
    }

    /// Every price id referenced by a campaign.
    pub fn supported_prices(&self) -> Vec<String> {
        self.campaigns.iter().map(|c| c.price_id.clone()).collect()
    }
}

/// Logging and calendar configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// IANA timezone the daily send hour is expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Local hour (0-23) at which every send day starts.
    #[serde(default = "default_send_hour")]
    pub send_hour: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            timezone: default_timezone(),
            send_hour: default_send_hour(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "Europe/Helsinki".to_string()
}

fn default_send_hour() -> u32 {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("dealmail").join("dealmail.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("dealmail.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Retry configuration for store and transport calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts; the n-th retry waits n times this.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

/// Dispatch batch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Maximum due entries sent per batch.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
        }
    }
}

fn default_batch_limit() -> usize {
    150
}

/// Mail provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    /// Provider API key. `None` disables dispatch.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Provider API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    #[serde(default)]
    pub sender_address: String,

    /// Unsubscribe group every campaign email belongs to.
    #[serde(default)]
    pub unsubscribe_group_id: u32,

    /// Groups shown on the provider's unsubscribe page.
    #[serde(default)]
    pub unsubscribe_group_ids: Vec<u32>,

    /// Language used when a locale matches no configured language.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Languages with templates, matched exactly or by `<lang>-` prefix.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// HTTP timeout per send.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Template key -> language -> provider template id.
    #[serde(default)]
    pub templates: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
            sender_name: default_sender_name(),
            sender_address: String::new(),
            unsubscribe_group_id: 0,
            unsubscribe_group_ids: Vec::new(),
            default_language: default_language(),
            languages: default_languages(),
            timeout_secs: default_timeout_secs(),
            templates: BTreeMap::new(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_sender_name() -> String {
    "dealmail".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["fi".to_string(), "en".to_string(), "sv".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

/// Checkout link configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    /// Base URL of the checkout site, without a trailing slash.
    #[serde(default)]
    pub base_url: String,
}

/// Banned-address list configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BannedConfig {
    /// Comma-delimited file of identities never to contact.
    #[serde(default)]
    pub path: Option<String>,
}

/// Candidate feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// JSON-lines export of user records.
    #[serde(default = "default_users_path")]
    pub users_path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            users_path: default_users_path(),
        }
    }
}

fn default_users_path() -> String {
    "users.jsonl".to_string()
}

/// Which side of the registration window a candidate must fall on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationRule {
    /// Reject candidates registered within the window.
    #[default]
    ExcludeRecent,
    /// Reject candidates registered before the window.
    RequireRecent,
}

/// How candidates without a registration date are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRegistration {
    Include,
    #[default]
    Exclude,
}

/// One campaign variant: audience, eligibility policy, and throughput caps.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    /// Campaign tag stored on queue entries and sent records.
    pub name: String,

    /// Key into `mail.templates`.
    pub template_key: String,

    /// Price id embedded in the checkout link.
    pub price_id: String,

    #[serde(default = "default_max_per_day")]
    pub max_per_day: u32,

    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,

    /// Hours between two hour buckets of the same day.
    #[serde(default = "default_hour_gap_hours")]
    pub hour_gap_hours: u32,

    /// Candidates not updated within this many months are stale.
    #[serde(default = "default_recency_months")]
    pub recency_months: u32,

    #[serde(default = "default_registration_window_days")]
    pub registration_window_days: u32,

    #[serde(default)]
    pub registration_rule: RegistrationRule,

    #[serde(default)]
    pub missing_registration: MissingRegistration,

    /// Locale prefix a present locale must start with (case-insensitive).
    #[serde(default = "default_target_locale_prefix")]
    pub target_locale_prefix: String,

    /// Locale stored when the candidate has none.
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Display name stored when the candidate has none.
    #[serde(default = "default_display_name")]
    pub default_display_name: String,

    #[serde(default = "default_audience")]
    pub audience: Audience,

    /// Source campaign for a `follow_up` audience.
    #[serde(default)]
    pub follow_up_of: Option<String>,

    /// Extra identities to exclude for this campaign only.
    #[serde(default)]
    pub exclude_path: Option<String>,
}

impl CampaignConfig {
    /// A campaign with default policy, used by tests and `config check`.
    pub fn new(name: &str, template_key: &str, price_id: &str) -> Self {
        Self {
            name: name.to_string(),
            template_key: template_key.to_string(),
            price_id: price_id.to_string(),
            max_per_day: default_max_per_day(),
            max_per_hour: default_max_per_hour(),
            hour_gap_hours: default_hour_gap_hours(),
            recency_months: default_recency_months(),
            registration_window_days: default_registration_window_days(),
            registration_rule: RegistrationRule::default(),
            missing_registration: MissingRegistration::default(),
            target_locale_prefix: default_target_locale_prefix(),
            default_locale: default_locale(),
            default_display_name: default_display_name(),
            audience: default_audience(),
            follow_up_of: None,
            exclude_path: None,
        }
    }
}

fn default_max_per_day() -> u32 {
    500
}

fn default_max_per_hour() -> u32 {
    60
}

fn default_hour_gap_hours() -> u32 {
    2
}

fn default_recency_months() -> u32 {
    3
}

fn default_registration_window_days() -> u32 {
    14
}

fn default_target_locale_prefix() -> String {
    "fi-".to_string()
}

fn default_locale() -> String {
    "fi".to_string()
}

fn default_display_name() -> String {
    "te".to_string()
}

fn default_audience() -> Audience {
    Audience::Users
}
