// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SLA record operations.
//!
//! The sweep functions select and flip records inside one transaction and
//! gate every flip on `violated_at IS NULL` (or the pre-flip status), so a
//! record is reported as newly warned or newly violated exactly once no
//! matter how often sweeps overlap.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use handoff_core::types::{Priority, SlaEntityType, SlaRecord, SlaStatus};
use rusqlite::params;

use crate::database::Database;
use crate::models::{SLA_RECORD_COLUMNS, sla_record_from_row};

pub async fn insert_record(db: &Database, record: &SlaRecord) -> Result<(), HandoffError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sla_records (id, entity_id, entity_type, priority, category, status,
                     created_at, response_deadline, resolution_deadline, warning_threshold,
                     first_response_at, response_on_time, resolved_at, resolution_on_time,
                     total_resolution_minutes, violated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    record.id,
                    record.entity_id,
                    record.entity_type.to_string(),
                    record.priority.rank(),
                    record.category,
                    record.status.to_string(),
                    record.created_at,
                    record.response_deadline,
                    record.resolution_deadline,
                    record.warning_threshold,
                    record.first_response_at,
                    record.response_on_time,
                    record.resolved_at,
                    record.resolution_on_time,
                    record.total_resolution_minutes,
                    record.violated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The open (active or warning) record for an entity, if any. The partial
/// unique index guarantees at most one.
pub async fn open_record(
    db: &Database,
    entity_id: &str,
    entity_type: SlaEntityType,
) -> Result<Option<SlaRecord>, HandoffError> {
    let entity_id = entity_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {SLA_RECORD_COLUMNS} FROM sla_records
                     WHERE entity_id = ?1 AND entity_type = ?2
                       AND status IN ('active', 'warning')"
                ),
                params![entity_id, entity_type.to_string()],
                sla_record_from_row,
            );
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Stamp the first response on an open record. The `first_response_at IS
/// NULL` guard makes repeat calls no-ops; returns whether this call won.
pub async fn record_first_response(
    db: &Database,
    entity_id: &str,
    entity_type: SlaEntityType,
    at: DateTime<Utc>,
) -> Result<bool, HandoffError> {
    let entity_id = entity_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sla_records
                 SET first_response_at = ?1,
                     response_on_time = CASE WHEN ?1 <= response_deadline THEN 1 ELSE 0 END
                 WHERE entity_id = ?2 AND entity_type = ?3
                   AND status IN ('active', 'warning')
                   AND first_response_at IS NULL",
                params![at, entity_id, entity_type.to_string()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Close the open record for an entity as completed, stamping resolution
/// timing. A record past its deadline keeps `violated` as its final status.
pub async fn complete_record(
    db: &Database,
    entity_id: &str,
    entity_type: SlaEntityType,
    at: DateTime<Utc>,
) -> Result<bool, HandoffError> {
    let entity_id = entity_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sla_records
                 SET status = 'completed',
                     resolved_at = ?1,
                     resolution_on_time = CASE WHEN ?1 <= resolution_deadline THEN 1 ELSE 0 END,
                     total_resolution_minutes =
                         CAST((julianday(?1) - julianday(created_at)) * 1440 AS INTEGER)
                 WHERE entity_id = ?2 AND entity_type = ?3
                   AND status IN ('active', 'warning')",
                params![at, entity_id, entity_type.to_string()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Raise the priority of an entity's open record and tighten its deadlines.
pub async fn upgrade_open_record(
    db: &Database,
    entity_id: &str,
    entity_type: SlaEntityType,
    priority: Priority,
    response_deadline: DateTime<Utc>,
    resolution_deadline: DateTime<Utc>,
    warning_threshold: DateTime<Utc>,
) -> Result<bool, HandoffError> {
    let entity_id = entity_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sla_records
                 SET priority = ?1, response_deadline = ?2, resolution_deadline = ?3,
                     warning_threshold = ?4
                 WHERE entity_id = ?5 AND entity_type = ?6
                   AND status IN ('active', 'warning')",
                params![
                    priority.rank(),
                    response_deadline,
                    resolution_deadline,
                    warning_threshold,
                    entity_id,
                    entity_type.to_string(),
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip `active` records whose warning threshold has passed to `warning`,
/// returning only the records flipped by this call.
pub async fn sweep_warnings(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<SlaRecord>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let due = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SLA_RECORD_COLUMNS} FROM sla_records
                     WHERE status = 'active' AND warning_threshold <= ?1
                       AND first_response_at IS NULL
                     ORDER BY warning_threshold ASC"
                ))?;
                let rows = stmt.query_map(params![now], sla_record_from_row)?;
                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }
                records
            };
            for record in &due {
                tx.execute(
                    "UPDATE sla_records SET status = 'warning'
                     WHERE id = ?1 AND status = 'active'",
                    params![record.id],
                )?;
            }
            tx.commit()?;
            Ok(due)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark open records past a deadline as violated, returning only the
/// records flipped by this call. Response violations require that no first
/// response was recorded; resolution violations apply regardless.
pub async fn sweep_violations(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<SlaRecord>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let due = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SLA_RECORD_COLUMNS} FROM sla_records
                     WHERE status IN ('active', 'warning')
                       AND violated_at IS NULL
                       AND ((first_response_at IS NULL AND response_deadline <= ?1)
                            OR resolution_deadline <= ?1)
                     ORDER BY response_deadline ASC"
                ))?;
                let rows = stmt.query_map(params![now], sla_record_from_row)?;
                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }
                records
            };
            for record in &due {
                tx.execute(
                    "UPDATE sla_records SET status = 'violated', violated_at = ?1
                     WHERE id = ?2 AND violated_at IS NULL",
                    params![now, record.id],
                )?;
            }
            tx.commit()?;
            Ok(due)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Aggregate counts for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlaSummary {
    pub active: usize,
    pub warning: usize,
    pub violated: usize,
    pub completed: usize,
    pub responses_on_time: usize,
    pub responses_late: usize,
    pub resolutions_on_time: usize,
    pub resolutions_late: usize,
}

pub async fn summary(db: &Database) -> Result<SlaSummary, HandoffError> {
    db.connection()
        .call(move |conn| {
            let mut out = SlaSummary::default();
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM sla_records GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, count) = row?;
                let count = count as usize;
                match status.as_str() {
                    "active" => out.active = count,
                    "warning" => out.warning = count,
                    "violated" => out.violated = count,
                    "completed" => out.completed = count,
                    _ => {}
                }
            }
            let (r_on, r_late, s_on, s_late): (i64, i64, i64, i64) = conn.query_row(
                "SELECT
                     SUM(CASE WHEN response_on_time = 1 THEN 1 ELSE 0 END),
                     SUM(CASE WHEN response_on_time = 0 THEN 1 ELSE 0 END),
                     SUM(CASE WHEN resolution_on_time = 1 THEN 1 ELSE 0 END),
                     SUM(CASE WHEN resolution_on_time = 0 THEN 1 ELSE 0 END)
                 FROM sla_records",
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<i64>>(0)?.unwrap_or(0),
                        row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                        row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    ))
                },
            )?;
            out.responses_on_time = r_on as usize;
            out.responses_late = r_late as usize;
            out.resolutions_on_time = s_on as usize;
            out.resolutions_late = s_late as usize;
            Ok(out)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Per-priority timing aggregates over records created since a cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityMetrics {
    pub priority: Priority,
    pub total: usize,
    pub violated: usize,
    pub responses_on_time: usize,
    pub avg_response_minutes: Option<f64>,
    pub avg_resolution_minutes: Option<f64>,
}

pub async fn priority_metrics(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<Vec<PriorityMetrics>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT priority,
                        COUNT(*),
                        SUM(CASE WHEN violated_at IS NOT NULL THEN 1 ELSE 0 END),
                        SUM(CASE WHEN response_on_time = 1 THEN 1 ELSE 0 END),
                        AVG(CASE WHEN first_response_at IS NOT NULL
                            THEN (julianday(first_response_at) - julianday(created_at)) * 1440
                        END),
                        AVG(total_resolution_minutes)
                 FROM sla_records
                 WHERE created_at >= ?1
                 GROUP BY priority
                 ORDER BY priority DESC",
            )?;
            let rows = stmt.query_map(params![since], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                ))
            })?;
            let mut metrics = Vec::new();
            for row in rows {
                let (rank, total, violated, on_time, avg_resp, avg_reso) = row?;
                if let Some(priority) = Priority::from_rank(rank) {
                    metrics.push(PriorityMetrics {
                        priority,
                        total: total as usize,
                        violated: violated as usize,
                        responses_on_time: on_time as usize,
                        avg_response_minutes: avg_resp,
                        avg_resolution_minutes: avg_reso,
                    });
                }
            }
            Ok(metrics)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
