// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue entry operations.
//!
//! Entries are append-only: every operation here transitions status rather
//! than deleting rows. The claim path combines candidate selection and the
//! waiting->assigned flip in a single transaction so two operators becoming
//! available concurrently can never both take the same entry.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use handoff_core::types::{Priority, QueueEntry};
use rusqlite::params;

use crate::database::Database;
use crate::models::{QUEUE_ENTRY_COLUMNS, queue_entry_from_row, skills_to_json};

/// Insert a new entry. The partial unique index on live entries makes a
/// duplicate insert for a session with a waiting/assigned entry fail.
pub async fn insert_entry(db: &Database, entry: &QueueEntry) -> Result<(), HandoffError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue_entries (id, session_id, priority, required_skills, status,
                     entered_at, assigned_at, assigned_to, cancelled_at, cancel_reason,
                     estimated_wait_minutes, sla_warning_notified, sla_violation_notified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    entry.id,
                    entry.session_id,
                    entry.priority.rank(),
                    skills_to_json(&entry.required_skills),
                    entry.status.to_string(),
                    entry.entered_at,
                    entry.assigned_at,
                    entry.assigned_to,
                    entry.cancelled_at,
                    entry.cancel_reason,
                    entry.estimated_wait_minutes,
                    entry.sla_warning_notified,
                    entry.sla_violation_notified,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The live (waiting or assigned) entry for a session, if any.
pub async fn live_entry_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Option<QueueEntry>, HandoffError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUEUE_ENTRY_COLUMNS} FROM queue_entries
                 WHERE session_id = ?1 AND status IN ('waiting', 'assigned')"
            ))?;
            let result = stmt.query_row(params![session_id], queue_entry_from_row);
            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All waiting entries in queue order (priority desc, entered_at asc).
pub async fn list_waiting(db: &Database) -> Result<Vec<QueueEntry>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUEUE_ENTRY_COLUMNS} FROM queue_entries
                 WHERE status = 'waiting'
                 ORDER BY priority DESC, entered_at ASC"
            ))?;
            let rows = stmt.query_map([], queue_entry_from_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim the next eligible waiting entry for an operator.
///
/// Candidates are walked in queue order; an entry is eligible when its
/// required skills are empty or intersect `operator_skills`. The flip to
/// `assigned` re-checks `status = 'waiting'` inside the same transaction
/// and skips the candidate if another claimer got there first.
pub async fn claim_next(
    db: &Database,
    operator_id: &str,
    operator_skills: &[String],
) -> Result<Option<QueueEntry>, HandoffError> {
    let operator_id = operator_id.to_string();
    let operator_skills = operator_skills.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();

            let candidates = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {QUEUE_ENTRY_COLUMNS} FROM queue_entries
                     WHERE status = 'waiting'
                     ORDER BY priority DESC, entered_at ASC"
                ))?;
                let rows = stmt.query_map([], queue_entry_from_row)?;
                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?);
                }
                entries
            };

            for mut entry in candidates {
                let eligible = entry.required_skills.is_empty()
                    || entry
                        .required_skills
                        .iter()
                        .any(|s| operator_skills.contains(s));
                if !eligible {
                    continue;
                }

                let claimed = tx.execute(
                    "UPDATE queue_entries
                     SET status = 'assigned', assigned_to = ?1, assigned_at = ?2
                     WHERE id = ?3 AND status = 'waiting'",
                    params![operator_id, now, entry.id],
                )?;
                if claimed == 1 {
                    tx.commit()?;
                    entry.status = handoff_core::types::QueueStatus::Assigned;
                    entry.assigned_to = Some(operator_id);
                    entry.assigned_at = Some(now);
                    return Ok(Some(entry));
                }
                // Lost the race on this entry; try the next candidate.
            }

            tx.commit()?;
            Ok(None)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Cancel a waiting entry. Returns `false` when the entry was not waiting
/// (assigned entries leave the queue only through chat closure).
pub async fn cancel_waiting(
    db: &Database,
    session_id: &str,
    reason: &str,
) -> Result<bool, HandoffError> {
    let session_id = session_id.to_string();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE queue_entries
                 SET status = 'cancelled', cancelled_at = ?1, cancel_reason = ?2
                 WHERE session_id = ?3 AND status = 'waiting'",
                params![Utc::now(), reason, session_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Time out waiting entries that entered before `cutoff`. Returns the
/// entries flipped, already reflecting their `timeout` status.
pub async fn timeout_overdue(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            let mut overdue = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {QUEUE_ENTRY_COLUMNS} FROM queue_entries
                     WHERE status = 'waiting' AND entered_at < ?1"
                ))?;
                let rows = stmt.query_map(params![cutoff], queue_entry_from_row)?;
                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?);
                }
                entries
            };
            for entry in &mut overdue {
                tx.execute(
                    "UPDATE queue_entries SET status = 'timeout', cancelled_at = ?1
                     WHERE id = ?2 AND status = 'waiting'",
                    params![now, entry.id],
                )?;
                entry.status = handoff_core::types::QueueStatus::Timeout;
                entry.cancelled_at = Some(now);
            }
            tx.commit()?;
            Ok(overdue)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record that an SLA warning or violation notice went out for a session's
/// waiting entry. Returns `false` when the session has no waiting entry.
pub async fn mark_sla_notified(
    db: &Database,
    session_id: &str,
    violation: bool,
) -> Result<bool, HandoffError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = if violation {
                "UPDATE queue_entries SET sla_violation_notified = 1
                 WHERE session_id = ?1 AND status = 'waiting'"
            } else {
                "UPDATE queue_entries SET sla_warning_notified = 1
                 WHERE session_id = ?1 AND status = 'waiting'"
            };
            let changed = conn.execute(sql, params![session_id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// 1-based queue position: the count of waiting entries that outrank this
/// one (higher priority, or same priority but earlier), plus one.
pub async fn waiting_position(
    db: &Database,
    session_id: &str,
) -> Result<Option<usize>, HandoffError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let target: Option<(i64, DateTime<Utc>)> = {
                let result = conn.query_row(
                    "SELECT priority, entered_at FROM queue_entries
                     WHERE session_id = ?1 AND status = 'waiting'",
                    params![session_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                );
                match result {
                    Ok(pair) => Some(pair),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };

            let Some((priority, entered_at)) = target else {
                return Ok(None);
            };

            let ahead: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_entries
                 WHERE status = 'waiting'
                   AND (priority > ?1 OR (priority = ?1 AND entered_at < ?2))",
                params![priority, entered_at],
                |row| row.get(0),
            )?;
            Ok(Some(ahead as usize + 1))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Cancel waiting entries whose session already reached a closed status
/// without going through the removal path. Returns the repaired entries.
pub async fn cancel_orphaned(db: &Database) -> Result<Vec<QueueEntry>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let orphans = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {QUEUE_ENTRY_COLUMNS} FROM queue_entries q
                     WHERE q.status = 'waiting'
                       AND EXISTS (
                           SELECT 1 FROM sessions s
                           WHERE s.id = q.session_id
                             AND s.status IN ('ended', 'cancelled', 'resolved', 'not_resolved')
                       )"
                ))?;
                let rows = stmt.query_map([], queue_entry_from_row)?;
                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?);
                }
                entries
            };
            for entry in &orphans {
                tx.execute(
                    "UPDATE queue_entries
                     SET status = 'cancelled', cancelled_at = ?1, cancel_reason = 'session closed'
                     WHERE id = ?2 AND status = 'waiting'",
                    params![Utc::now(), entry.id],
                )?;
            }
            tx.commit()?;
            Ok(orphans)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Waiting / assigned counts plus per-priority waiting breakdown.
pub async fn queue_counts(db: &Database) -> Result<QueueCounts, HandoffError> {
    db.connection()
        .call(move |conn| {
            let waiting: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_entries WHERE status = 'waiting'",
                [],
                |row| row.get(0),
            )?;
            let assigned: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_entries WHERE status = 'assigned'",
                [],
                |row| row.get(0),
            )?;
            let mut by_priority = Vec::new();
            let mut stmt = conn.prepare(
                "SELECT priority, COUNT(*) FROM queue_entries
                 WHERE status = 'waiting' GROUP BY priority ORDER BY priority DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (rank, count) = row?;
                if let Some(priority) = Priority::from_rank(rank) {
                    by_priority.push((priority, count as usize));
                }
            }
            Ok(QueueCounts {
                waiting: waiting as usize,
                assigned: assigned as usize,
                waiting_by_priority: by_priority,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mean minutes between entering the queue and assignment, over all
/// assigned entries. `None` when nothing has been assigned yet.
pub async fn average_wait_minutes(db: &Database) -> Result<Option<f64>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let avg: Option<f64> = conn.query_row(
                "SELECT AVG((julianday(assigned_at) - julianday(entered_at)) * 1440)
                 FROM queue_entries
                 WHERE status = 'assigned' AND assigned_at IS NOT NULL",
                [],
                |row| row.get(0),
            )?;
            Ok(avg)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Aggregate queue counts for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueCounts {
    pub waiting: usize,
    pub assigned: usize,
    pub waiting_by_priority: Vec<(Priority, usize)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions;
    use handoff_core::types::{ChatSession, SessionStatus};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn seed_session(db: &Database, id: &str) {
        let now = Utc::now();
        sessions::create_session(
            db,
            &ChatSession {
                id: id.to_string(),
                channel: "web".to_string(),
                user_id: Some("user-1".to_string()),
                status: SessionStatus::Active,
                last_activity: now,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn insert_and_fetch_live_entry() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;

        let entry = QueueEntry::new("s1", Priority::High, vec![], 5);
        insert_entry(&db, &entry).await.unwrap();

        let live = live_entry_for_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(live.id, entry.id);
        assert_eq!(live.priority, Priority::High);
        assert_eq!(live.status, handoff_core::types::QueueStatus::Waiting);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_live_entry_for_session_is_rejected() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;

        insert_entry(&db, &QueueEntry::new("s1", Priority::Low, vec![], 30))
            .await
            .unwrap();
        let result = insert_entry(&db, &QueueEntry::new("s1", Priority::High, vec![], 5)).await;
        assert!(result.is_err(), "unique index should reject second live entry");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_follows_priority_then_fifo() {
        let (db, _dir) = setup_db().await;
        for id in ["s1", "s2", "s3"] {
            seed_session(&db, id).await;
        }

        let low = QueueEntry::new("s1", Priority::Low, vec![], 30);
        insert_entry(&db, &low).await.unwrap();
        // Slightly later, higher priority.
        let mut high = QueueEntry::new("s2", Priority::High, vec![], 5);
        high.entered_at = low.entered_at + chrono::Duration::seconds(1);
        insert_entry(&db, &high).await.unwrap();
        let mut low2 = QueueEntry::new("s3", Priority::Low, vec![], 30);
        low2.entered_at = low.entered_at + chrono::Duration::seconds(2);
        insert_entry(&db, &low2).await.unwrap();

        let first = claim_next(&db, "op-1", &[]).await.unwrap().unwrap();
        assert_eq!(first.session_id, "s2", "high priority wins");
        let second = claim_next(&db, "op-1", &[]).await.unwrap().unwrap();
        assert_eq!(second.session_id, "s1", "FIFO within band");
        let third = claim_next(&db, "op-1", &[]).await.unwrap().unwrap();
        assert_eq!(third.session_id, "s3");
        assert!(claim_next(&db, "op-1", &[]).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_skips_entries_requiring_missing_skills() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        seed_session(&db, "s2").await;

        let gated = QueueEntry::new("s1", Priority::Urgent, vec!["billing".into()], 5);
        insert_entry(&db, &gated).await.unwrap();
        let mut open = QueueEntry::new("s2", Priority::Low, vec![], 30);
        open.entered_at = gated.entered_at + chrono::Duration::seconds(1);
        insert_entry(&db, &open).await.unwrap();

        let claimed = claim_next(&db, "op-1", &["support".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.session_id, "s2", "skill-gated entry is skipped");

        let claimed = claim_next(&db, "op-2", &["billing".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.session_id, "s1");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claimed_entry_cannot_be_claimed_again() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        insert_entry(&db, &QueueEntry::new("s1", Priority::Medium, vec![], 10))
            .await
            .unwrap();

        let first = claim_next(&db, "op-1", &[]).await.unwrap();
        assert!(first.is_some());
        let second = claim_next(&db, "op-2", &[]).await.unwrap();
        assert!(second.is_none(), "at-most-one assignment per entry");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_only_affects_waiting() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        insert_entry(&db, &QueueEntry::new("s1", Priority::Medium, vec![], 10))
            .await
            .unwrap();

        assert!(cancel_waiting(&db, "s1", "user left").await.unwrap());
        // Entry row still exists (append-only history).
        assert!(live_entry_for_session(&db, "s1").await.unwrap().is_none());
        // Cancelling again is a no-op.
        assert!(!cancel_waiting(&db, "s1", "again").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn position_counts_outranking_entries() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        seed_session(&db, "s2").await;

        let low = QueueEntry::new("s1", Priority::Low, vec![], 30);
        insert_entry(&db, &low).await.unwrap();
        assert_eq!(waiting_position(&db, "s1").await.unwrap(), Some(1));

        let mut high = QueueEntry::new("s2", Priority::High, vec![], 5);
        high.entered_at = low.entered_at + chrono::Duration::seconds(1);
        insert_entry(&db, &high).await.unwrap();

        // The later, higher-priority arrival displaces the earlier one.
        assert_eq!(waiting_position(&db, "s2").await.unwrap(), Some(1));
        assert_eq!(waiting_position(&db, "s1").await.unwrap(), Some(2));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn overstayed_entries_time_out() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        seed_session(&db, "s2").await;

        let mut old = QueueEntry::new("s1", Priority::Low, vec![], 30);
        old.entered_at = Utc::now() - chrono::Duration::minutes(90);
        insert_entry(&db, &old).await.unwrap();
        insert_entry(&db, &QueueEntry::new("s2", Priority::Low, vec![], 30))
            .await
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::minutes(60);
        let flipped = timeout_overdue(&db, cutoff).await.unwrap();
        assert_eq!(flipped.len(), 1);
        assert_eq!(flipped[0].session_id, "s1");
        assert_eq!(flipped[0].status, handoff_core::types::QueueStatus::Timeout);

        // The fresh entry is untouched; a second sweep finds nothing.
        assert!(live_entry_for_session(&db, "s2").await.unwrap().is_some());
        assert!(timeout_overdue(&db, cutoff).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sla_flags_stick_to_waiting_entries() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        insert_entry(&db, &QueueEntry::new("s1", Priority::High, vec![], 5))
            .await
            .unwrap();

        assert!(mark_sla_notified(&db, "s1", false).await.unwrap());
        let entry = live_entry_for_session(&db, "s1").await.unwrap().unwrap();
        assert!(entry.sla_warning_notified);
        assert!(!entry.sla_violation_notified);

        // No waiting entry means nothing to flag.
        assert!(!mark_sla_notified(&db, "missing", true).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn orphaned_entries_are_repaired() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        insert_entry(&db, &QueueEntry::new("s1", Priority::Medium, vec![], 10))
            .await
            .unwrap();
        sessions::update_status(&db, "s1", SessionStatus::Ended)
            .await
            .unwrap();

        let repaired = cancel_orphaned(&db).await.unwrap();
        assert_eq!(repaired.len(), 1);
        assert!(live_entry_for_session(&db, "s1").await.unwrap().is_none());

        // Second sweep finds nothing.
        assert!(cancel_orphaned(&db).await.unwrap().is_empty());

        db.close().await.unwrap();
    }
}
