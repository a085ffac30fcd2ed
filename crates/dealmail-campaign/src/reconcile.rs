// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splits a settled dispatch batch into confirmed and retained entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dealmail_core::{QueueEntry, SendAttempt, SentRecord};

/// What to persist after a dispatch batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Ledger records to append, one per confirmed send.
    pub records: Vec<SentRecord>,
    /// Queue entries to delete once the records are durable.
    pub to_remove: Vec<i64>,
    /// Queue entries left in place for a later run.
    pub to_keep: Vec<i64>,
}

impl Reconciliation {
    pub fn confirmed(&self) -> usize {
        self.to_remove.len()
    }

    /// Whether some entries were not confirmed.
    pub fn is_partial(&self) -> bool {
        !self.to_keep.is_empty()
    }
}

/// Match attempts to entries. Only an explicit provider acceptance confirms
/// a send; an entry without an attempt is kept.
pub fn reconcile(
    due: &[QueueEntry],
    attempts: &[SendAttempt],
    sent_at: DateTime<Utc>,
) -> Reconciliation {
    let confirmed: HashMap<i64, bool> = attempts
        .iter()
        .map(|attempt| (attempt.entry_id, attempt.outcome.is_confirmed()))
        .collect();

    let mut reconciliation = Reconciliation::default();
    for entry in due {
        if confirmed.get(&entry.id).copied().unwrap_or(false) {
            reconciliation.records.push(SentRecord::for_entry(entry, sent_at));
            reconciliation.to_remove.push(entry.id);
        } else {
            reconciliation.to_keep.push(entry.id);
        }
    }
    reconciliation
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use dealmail_core::{DeliveryReceipt, SendOutcome};

    use super::*;

    fn entry(id: i64) -> QueueEntry {
        QueueEntry {
            id,
            identity: format!("user{id}@example.com"),
            campaign: "yearly".into(),
            locale: "fi".into(),
            display_name: "te".into(),
            scheduled_at: Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap(),
        }
    }

    fn attempt(id: i64, status: Option<u16>) -> SendAttempt {
        SendAttempt {
            entry_id: id,
            outcome: SendOutcome::Receipt(DeliveryReceipt {
                status,
                message_id: None,
            }),
        }
    }

    fn sent_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn three_of_five_confirmed() {
        let due: Vec<_> = (1..=5).map(entry).collect();
        let attempts = vec![
            attempt(1, Some(202)),
            attempt(2, Some(500)),
            attempt(3, Some(202)),
            attempt(4, Some(200)),
            attempt(5, Some(202)),
        ];

        let result = reconcile(&due, &attempts, sent_at());
        assert_eq!(result.to_remove, vec![1, 3, 5]);
        assert_eq!(result.to_keep, vec![2, 4]);
        assert_eq!(result.records.len(), result.to_remove.len());
        assert!(result.is_partial());
        assert_eq!(result.records[1].identity, "user3@example.com");
        assert_eq!(result.records[1].queue_id, Some(3));
    }

    #[test]
    fn failures_and_missing_attempts_are_kept() {
        let due: Vec<_> = (1..=3).map(entry).collect();
        let attempts = vec![
            SendAttempt {
                entry_id: 1,
                outcome: SendOutcome::Failed("connection reset".into()),
            },
            attempt(2, None),
        ];

        let result = reconcile(&due, &attempts, sent_at());
        assert!(result.to_remove.is_empty());
        assert!(result.records.is_empty());
        assert_eq!(result.to_keep, vec![1, 2, 3]);
    }

    #[test]
    fn all_confirmed_is_not_partial() {
        let due: Vec<_> = (1..=2).map(entry).collect();
        let attempts = vec![attempt(1, Some(202)), attempt(2, Some(202))];
        let result = reconcile(&due, &attempts, sent_at());
        assert!(!result.is_partial());
        assert_eq!(result.confirmed(), 2);
    }
}
