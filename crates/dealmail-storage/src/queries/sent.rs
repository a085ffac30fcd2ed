// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sent-ledger operations. Records are append-only.

use std::collections::HashSet;

use dealmail_core::{DealmailError, SentRecord};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::format_ts;
use crate::queries::queue::delete_ids;

/// Identities with a confirmed send for `campaign`.
pub async fn sent_identities(db: &Database, campaign: &str) -> Result<HashSet<String>, DealmailError> {
    let campaign = campaign.to_string();
    db.connection()
        .call(move |conn| -> Result<HashSet<String>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT DISTINCT identity FROM sent_records WHERE campaign = ?1")?;
            let rows = stmt.query_map(params![campaign], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Append records in one transaction. Returns the appended count.
pub async fn append(db: &Database, records: &[SentRecord]) -> Result<usize, DealmailError> {
    if records.is_empty() {
        return Ok(0);
    }
    let records = records.to_vec();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let appended = insert_records(&tx, &records)?;
            tx.commit()?;
            Ok(appended)
        })
        .await
        .map_err(map_tr_err)
}

/// Append records, then delete the confirmed queue rows, in one transaction.
///
/// Returns the number of queue rows removed.
pub async fn commit_delivery(
    db: &Database,
    records: &[SentRecord],
    remove_ids: &[i64],
) -> Result<usize, DealmailError> {
    if records.is_empty() && remove_ids.is_empty() {
        return Ok(0);
    }
    let records = records.to_vec();
    let remove_ids = remove_ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            insert_records(&tx, &records)?;
            let removed = delete_ids(&tx, &remove_ids)?;
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of confirmed sends for `campaign`.
pub async fn sent_count(db: &Database, campaign: &str) -> Result<u64, DealmailError> {
    let campaign = campaign.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM sent_records WHERE campaign = ?1",
                params![campaign],
                |row| row.get(0),
            )
        })
        .await
        .map(|count| count as u64)
        .map_err(map_tr_err)
}

fn insert_records(conn: &rusqlite::Connection, records: &[SentRecord]) -> Result<usize, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "INSERT INTO sent_records (queue_id, identity, campaign, locale, scheduled_at, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut appended = 0;
    for record in records {
        appended += stmt.execute(params![
            record.queue_id,
            record.identity,
            record.campaign,
            record.locale,
            record.scheduled_at.map(format_ts),
            format_ts(record.sent_at),
        ])?;
    }
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::queue;
    use chrono::{DateTime, TimeZone, Utc};
    use dealmail_core::NewQueueEntry;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn sent_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    fn record(identity: &str, campaign: &str) -> SentRecord {
        SentRecord {
            queue_id: None,
            identity: identity.to_string(),
            campaign: campaign.to_string(),
            locale: "fi".to_string(),
            scheduled_at: None,
            sent_at: sent_at(),
        }
    }

    #[tokio::test]
    async fn ledger_is_scoped_per_campaign() {
        let (db, _dir) = setup_db().await;
        append(
            &db,
            &[
                record("a@example.com", "yearly"),
                record("b@example.com", "yearly"),
                record("a@example.com", "half-year"),
            ],
        )
        .await
        .unwrap();

        let yearly = sent_identities(&db, "yearly").await.unwrap();
        assert_eq!(yearly.len(), 2);
        assert_eq!(sent_count(&db, "half-year").await.unwrap(), 1);
        assert_eq!(sent_count(&db, "monthly").await.unwrap(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn confirmed_sends_keep_counting_toward_their_slot() {
        let (db, _dir) = setup_db().await;
        let slot = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        let mut scheduled = record("a@example.com", "yearly");
        scheduled.scheduled_at = Some(slot);
        append(&db, &[scheduled, record("b@example.com", "yearly")])
            .await
            .unwrap();

        let counted = queue::count_scheduled_between(&db, "yearly", slot, sent_at())
            .await
            .unwrap();
        assert_eq!(counted, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn commit_delivery_appends_and_removes_together() {
        let (db, _dir) = setup_db().await;
        queue::insert_batch(
            &db,
            &[NewQueueEntry {
                identity: "a@example.com".into(),
                campaign: "yearly".into(),
                locale: "fi".into(),
                display_name: "te".into(),
                scheduled_at: Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap(),
            }],
        )
        .await
        .unwrap();
        let due = queue::due_entries(&db, sent_at(), 10).await.unwrap();
        let records = vec![SentRecord::for_entry(&due[0], sent_at())];

        let removed = commit_delivery(&db, &records, &[due[0].id]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(queue::due_entries(&db, sent_at(), 10).await.unwrap().is_empty());
        assert!(
            sent_identities(&db, "yearly")
                .await
                .unwrap()
                .contains("a@example.com")
        );
        db.close().await.unwrap();
    }
}
