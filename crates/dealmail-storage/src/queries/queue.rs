// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send-queue operations.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dealmail_core::{DealmailError, NewQueueEntry, QueueEntry, QueueSummary, QueueTail};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::queries::{format_ts, parse_ts};

/// Every identity with a pending entry, across all campaigns.
pub async fn queued_identities(db: &Database) -> Result<HashSet<String>, DealmailError> {
    db.connection()
        .call(|conn| -> Result<HashSet<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT DISTINCT identity FROM queue_entries")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Latest `scheduled_at` of a campaign and the number of entries sharing it.
pub async fn queue_tail(db: &Database, campaign: &str) -> Result<Option<QueueTail>, DealmailError> {
    let campaign = campaign.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueTail>, rusqlite::Error> {
            let row: Option<(String, u32)> = conn
                .query_row(
                    "SELECT scheduled_at, COUNT(*) FROM queue_entries
                     WHERE campaign = ?1
                     GROUP BY scheduled_at
                     ORDER BY scheduled_at DESC
                     LIMIT 1",
                    params![campaign],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            row.map(|(latest, at_latest)| {
                Ok(QueueTail {
                    latest: parse_ts(0, &latest)?,
                    at_latest,
                })
            })
            .transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Sends of a campaign scheduled in `from..=until`, pending or already sent.
pub async fn count_scheduled_between(
    db: &Database,
    campaign: &str,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<u32, DealmailError> {
    let campaign = campaign.to_string();
    let from = format_ts(from);
    let until = format_ts(until);
    db.connection()
        .call(move |conn| -> Result<u32, rusqlite::Error> {
            conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM queue_entries
                     WHERE campaign = ?1 AND scheduled_at >= ?2 AND scheduled_at <= ?3)
                  + (SELECT COUNT(*) FROM sent_records
                     WHERE campaign = ?1 AND scheduled_at >= ?2 AND scheduled_at <= ?3)",
                params![campaign, from, until],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Insert all entries in one transaction. Returns the inserted count.
pub async fn insert_batch(db: &Database, entries: &[NewQueueEntry]) -> Result<usize, DealmailError> {
    if entries.is_empty() {
        return Ok(0);
    }
    let entries = entries.to_vec();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO queue_entries
                     (identity, campaign, locale, display_name, scheduled_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for entry in &entries {
                    inserted += stmt.execute(params![
                        entry.identity,
                        entry.campaign,
                        entry.locale,
                        entry.display_name,
                        format_ts(entry.scheduled_at),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)
}

/// Entries strictly due before `now`, oldest first, at most `limit`.
pub async fn due_entries(
    db: &Database,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<QueueEntry>, DealmailError> {
    let now = format_ts(now);
    let limit = limit as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<QueueEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, identity, campaign, locale, display_name, scheduled_at
                 FROM queue_entries
                 WHERE scheduled_at < ?1
                 ORDER BY scheduled_at ASC, id ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![now, limit], |row| {
                let scheduled_at: String = row.get(5)?;
                Ok(QueueEntry {
                    id: row.get(0)?,
                    identity: row.get(1)?,
                    campaign: row.get(2)?,
                    locale: row.get(3)?,
                    display_name: row.get(4)?,
                    scheduled_at: parse_ts(5, &scheduled_at)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete entries by id in one transaction. Returns the deleted count.
pub async fn remove(db: &Database, ids: &[i64]) -> Result<usize, DealmailError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let removed = delete_ids(&tx, &ids)?;
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

pub(crate) fn delete_ids(conn: &rusqlite::Connection, ids: &[i64]) -> Result<usize, rusqlite::Error> {
    let mut stmt = conn.prepare("DELETE FROM queue_entries WHERE id = ?1")?;
    let mut removed = 0;
    for id in ids {
        removed += stmt.execute(params![id])?;
    }
    Ok(removed)
}

/// Queued, due, and latest scheduled time for one campaign.
pub async fn summary(
    db: &Database,
    campaign: &str,
    now: DateTime<Utc>,
) -> Result<QueueSummary, DealmailError> {
    let campaign = campaign.to_string();
    let now = format_ts(now);
    db.connection()
        .call(move |conn| -> Result<QueueSummary, rusqlite::Error> {
            let (queued, due, latest): (i64, i64, Option<String>) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN scheduled_at < ?2 THEN 1 ELSE 0 END), 0),
                        MAX(scheduled_at)
                 FROM queue_entries WHERE campaign = ?1",
                params![campaign, now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            Ok(QueueSummary {
                queued: queued as u64,
                due: due as u64,
                latest: latest.map(|ts| parse_ts(2, &ts)).transpose()?,
            })
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn entry(identity: &str, campaign: &str, scheduled_at: DateTime<Utc>) -> NewQueueEntry {
        NewQueueEntry {
            identity: identity.to_string(),
            campaign: campaign.to_string(),
            locale: "fi".to_string(),
            display_name: "te".to_string(),
            scheduled_at,
        }
    }

    #[tokio::test]
    async fn insert_and_read_due_entries() {
        let (db, _dir) = setup_db().await;

        let inserted = insert_batch(
            &db,
            &[
                entry("b@example.com", "yearly", at(10, 8)),
                entry("a@example.com", "yearly", at(10, 8)),
                entry("c@example.com", "yearly", at(12, 8)),
            ],
        )
        .await
        .unwrap();
        assert_eq!(inserted, 3);

        let due = due_entries(&db, at(11, 0), 10).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].identity, "b@example.com", "ties break by insertion id");
        assert_eq!(due[0].scheduled_at, at(10, 8));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_is_strictly_before_now() {
        let (db, _dir) = setup_db().await;
        insert_batch(&db, &[entry("a@example.com", "yearly", at(10, 8))])
            .await
            .unwrap();

        assert!(due_entries(&db, at(10, 8), 10).await.unwrap().is_empty());
        assert_eq!(due_entries(&db, at(10, 9), 10).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_entries_respects_limit() {
        let (db, _dir) = setup_db().await;
        let entries: Vec<_> = (0..5)
            .map(|i| entry(&format!("u{i}@example.com"), "yearly", at(10, 8)))
            .collect();
        insert_batch(&db, &entries).await.unwrap();

        assert_eq!(due_entries(&db, at(11, 0), 3).await.unwrap().len(), 3);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn tail_reports_latest_and_count() {
        let (db, _dir) = setup_db().await;
        assert!(queue_tail(&db, "yearly").await.unwrap().is_none());

        insert_batch(
            &db,
            &[
                entry("a@example.com", "yearly", at(10, 8)),
                entry("b@example.com", "yearly", at(10, 10)),
                entry("c@example.com", "yearly", at(10, 10)),
                entry("d@example.com", "half-year", at(20, 8)),
            ],
        )
        .await
        .unwrap();

        let tail = queue_tail(&db, "yearly").await.unwrap().unwrap();
        assert_eq!(tail.latest, at(10, 10));
        assert_eq!(tail.at_latest, 2);
        assert_eq!(
            count_scheduled_between(&db, "yearly", at(10, 8), at(10, 10))
                .await
                .unwrap(),
            3
        );
        assert_eq!(
            count_scheduled_between(&db, "yearly", at(10, 9), at(10, 10))
                .await
                .unwrap(),
            2
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_and_summary() {
        let (db, _dir) = setup_db().await;
        insert_batch(
            &db,
            &[
                entry("a@example.com", "yearly", at(10, 8)),
                entry("b@example.com", "yearly", at(12, 8)),
            ],
        )
        .await
        .unwrap();

        let summary_before = summary(&db, "yearly", at(11, 0)).await.unwrap();
        assert_eq!(summary_before.queued, 2);
        assert_eq!(summary_before.due, 1);
        assert_eq!(summary_before.latest, Some(at(12, 8)));

        let due = due_entries(&db, at(11, 0), 10).await.unwrap();
        assert_eq!(remove(&db, &[due[0].id, 9999]).await.unwrap(), 1);

        let identities = queued_identities(&db).await.unwrap();
        assert_eq!(identities, HashSet::from(["b@example.com".to_string()]));

        let empty = summary(&db, "missing", at(11, 0)).await.unwrap();
        assert_eq!(empty, QueueSummary::default());
        db.close().await.unwrap();
    }
}
