// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the scheduler, the stores, and the dispatcher.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Provider status code that marks a send as accepted for delivery.
pub const ACCEPTED_STATUS: u16 = 202;

/// A user record evaluated for campaign inclusion.
///
/// Read-only projection of the external user source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Opaque identity key, in practice the email address.
    pub identity: String,
    pub last_updated_at: DateTime<Utc>,
    /// When the user first registered, if known.
    pub registered_at: Option<DateTime<Utc>>,
    pub has_app_store_payment: bool,
    pub has_play_store_payment: bool,
    /// Free-form BCP-47-like tag such as `fi-FI`.
    pub locale: Option<String>,
    pub display_name: Option<String>,
}

/// Identities that must never be (re)queued for a campaign.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSets {
    /// Loaded from the banned-address file once per run.
    pub banned: HashSet<String>,
    /// The campaign's sent-ledger.
    pub sent: HashSet<String>,
    /// Every identity with a pending queue entry, across all campaigns.
    pub queued: HashSet<String>,
}

impl ExclusionSets {
    pub fn new(banned: HashSet<String>, sent: HashSet<String>, queued: HashSet<String>) -> Self {
        Self {
            banned,
            sent,
            queued,
        }
    }

    /// Membership in any of the three sets.
    pub fn contains(&self, identity: &str) -> bool {
        self.banned.contains(identity)
            || self.sent.contains(identity)
            || self.queued.contains(identity)
    }

    /// Record an identity scheduled during the current pass so a duplicate
    /// later in the same feed is rejected.
    pub fn mark_queued(&mut self, identity: &str) {
        self.queued.insert(identity.to_string());
    }
}

/// Which audience a campaign draws its candidates from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Audience {
    /// Screen the whole user feed with the eligibility filter.
    Users,
    /// Recipients already contacted by another campaign.
    FollowUp,
}

/// A send computed by the scheduler, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQueueEntry {
    pub identity: String,
    pub campaign: String,
    pub locale: String,
    pub display_name: String,
    pub scheduled_at: DateTime<Utc>,
}

/// A persisted, scheduled-but-not-yet-sent email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub identity: String,
    pub campaign: String,
    pub locale: String,
    pub display_name: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Permanent proof that a send was confirmed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentRecord {
    /// The queue entry this record confirms.
    pub queue_id: Option<i64>,
    pub identity: String,
    pub campaign: String,
    pub locale: String,
    /// The slot the send was scheduled for, kept so a day's sends still count
    /// against its cap after they leave the queue.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: DateTime<Utc>,
}

impl SentRecord {
    pub fn for_entry(entry: &QueueEntry, sent_at: DateTime<Utc>) -> Self {
        Self {
            queue_id: Some(entry.id),
            identity: entry.identity.clone(),
            campaign: entry.campaign.clone(),
            locale: entry.locale.clone(),
            scheduled_at: Some(entry.scheduled_at),
            sent_at,
        }
    }
}

/// The last scheduled instant of a campaign and how many entries share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTail {
    pub latest: DateTime<Utc>,
    pub at_latest: u32,
}

/// Scheduling position recomputed from the queue at the start of each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleCursor {
    /// Latest `scheduled_at` of the campaign, `None` when nothing is queued.
    pub latest: Option<DateTime<Utc>>,
    /// Entries sharing exactly `latest` (hour bucket fill).
    pub at_latest: u32,
    /// Entries in the send-day bucket that contains `latest` (day bucket fill).
    pub in_day_bucket: u32,
}

/// Counts reported by `dealmail status` for one campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub queued: u64,
    pub due: u64,
    pub latest: Option<DateTime<Utc>>,
}

/// Unsubscribe group settings attached to every campaign email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeGroup {
    pub group_id: u32,
    pub groups_to_display: Vec<u32>,
}

/// A fully resolved email ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMail {
    pub recipient: String,
    pub display_name: String,
    /// Provider template id resolved from the template key and locale.
    pub template_id: String,
    pub parameters: BTreeMap<String, String>,
    pub unsubscribe: UnsubscribeGroup,
}

/// What the provider answered for a single send.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryReceipt {
    /// HTTP status, `None` if the provider answered without one.
    pub status: Option<u16>,
    pub message_id: Option<String>,
}

impl DeliveryReceipt {
    pub fn accepted(message_id: Option<String>) -> Self {
        Self {
            status: Some(ACCEPTED_STATUS),
            message_id,
        }
    }

    /// Only the provider's explicit acceptance status counts as sent.
    pub fn is_confirmed(&self) -> bool {
        self.status == Some(ACCEPTED_STATUS)
    }
}

/// Settled result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The provider answered; confirmation depends on the status.
    Receipt(DeliveryReceipt),
    /// The send failed before or during the transport call.
    Failed(String),
}

impl SendOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SendOutcome::Receipt(receipt) if receipt.is_confirmed())
    }
}

/// One queue entry's settled attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAttempt {
    pub entry_id: i64,
    pub outcome: SendOutcome,
}
