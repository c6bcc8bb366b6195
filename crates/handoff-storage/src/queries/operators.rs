// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator pool queries.
//!
//! Capacity is derived, never stored: an operator's load is the count of
//! open rows in `operator_sessions`, so it cannot drift from reality.

use handoff_core::HandoffError;
use handoff_core::types::Operator;
use rusqlite::params;

use crate::database::Database;
use crate::models::{OPERATOR_COLUMNS, operator_from_row, skills_to_json};

pub async fn upsert_operator(db: &Database, operator: &Operator) -> Result<(), HandoffError> {
    let operator = operator.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO operators (id, name, role, skills, online, active, max_sessions, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     role = excluded.role,
                     skills = excluded.skills,
                     online = excluded.online,
                     active = excluded.active,
                     max_sessions = excluded.max_sessions",
                params![
                    operator.id,
                    operator.name,
                    operator.role.to_string(),
                    skills_to_json(&operator.skills),
                    operator.online,
                    operator.active,
                    operator.max_sessions,
                    operator.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_operator(db: &Database, id: &str) -> Result<Option<Operator>, HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {OPERATOR_COLUMNS} FROM operators WHERE id = ?1"),
                params![id],
                operator_from_row,
            );
            match result {
                Ok(op) => Ok(Some(op)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn set_online(db: &Database, id: &str, online: bool) -> Result<(), HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE operators SET online = ?1 WHERE id = ?2",
                params![online, id],
            )?;
            if changed == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Online, active operators with spare capacity, least-loaded first.
pub async fn list_available(db: &Database) -> Result<Vec<Operator>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OPERATOR_COLUMNS} FROM (
                     SELECT o.*, (
                         SELECT COUNT(*) FROM operator_sessions os
                         WHERE os.operator_id = o.id AND os.unlinked_at IS NULL
                     ) AS load
                     FROM operators o
                     WHERE o.online = 1 AND o.active = 1
                 )
                 WHERE load < max_sessions
                 ORDER BY load ASC, created_at ASC"
            ))?;
            let rows = stmt.query_map([], operator_from_row)?;
            let mut operators = Vec::new();
            for row in rows {
                operators.push(row?);
            }
            Ok(operators)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Supervisors and managers, for violation notifications.
pub async fn list_escalation_contacts(db: &Database) -> Result<Vec<Operator>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OPERATOR_COLUMNS} FROM operators
                 WHERE active = 1 AND role IN ('supervisor', 'manager')
                 ORDER BY role DESC, name ASC"
            ))?;
            let rows = stmt.query_map([], operator_from_row)?;
            let mut operators = Vec::new();
            for row in rows {
                operators.push(row?);
            }
            Ok(operators)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Pool-level counts used by the wait-time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub online: usize,
    /// Online operators with zero open sessions.
    pub idle: usize,
    /// Online operators with at least one open session.
    pub busy: usize,
}

pub async fn pool_snapshot(db: &Database) -> Result<PoolSnapshot, HandoffError> {
    db.connection()
        .call(move |conn| {
            let (online, idle): (i64, i64) = conn.query_row(
                "SELECT COUNT(*),
                        SUM(CASE WHEN load = 0 THEN 1 ELSE 0 END)
                 FROM (
                     SELECT (
                         SELECT COUNT(*) FROM operator_sessions os
                         WHERE os.operator_id = o.id AND os.unlinked_at IS NULL
                     ) AS load
                     FROM operators o
                     WHERE o.online = 1 AND o.active = 1
                 )",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    ))
                },
            )?;
            Ok(PoolSnapshot {
                online: online as usize,
                idle: idle as usize,
                busy: (online - idle) as usize,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions;
    use chrono::Utc;
    use handoff_core::types::{ChatSession, OperatorRole, SessionStatus};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn operator(id: &str, role: OperatorRole, online: bool, max_sessions: i64) -> Operator {
        Operator {
            id: id.to_string(),
            name: id.to_string(),
            role,
            skills: vec![],
            online,
            active: true,
            max_sessions,
            created_at: Utc::now(),
        }
    }

    async fn link(db: &Database, session_id: &str, operator_id: &str) {
        let now = Utc::now();
        sessions::create_session(
            db,
            &ChatSession {
                id: session_id.to_string(),
                channel: "web".to_string(),
                user_id: None,
                status: SessionStatus::WithOperator,
                last_activity: now,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        sessions::link_operator(db, session_id, operator_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upsert_replaces_mutable_fields() {
        let (db, _dir) = setup_db().await;
        let mut op = operator("op-1", OperatorRole::Agent, false, 3);
        upsert_operator(&db, &op).await.unwrap();

        op.online = true;
        op.skills = vec!["billing".to_string()];
        upsert_operator(&db, &op).await.unwrap();

        let loaded = get_operator(&db, "op-1").await.unwrap().unwrap();
        assert!(loaded.online);
        assert_eq!(loaded.skills, vec!["billing".to_string()]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn available_excludes_offline_and_full() {
        let (db, _dir) = setup_db().await;
        upsert_operator(&db, &operator("idle", OperatorRole::Agent, true, 3))
            .await
            .unwrap();
        upsert_operator(&db, &operator("offline", OperatorRole::Agent, false, 3))
            .await
            .unwrap();
        upsert_operator(&db, &operator("full", OperatorRole::Agent, true, 1))
            .await
            .unwrap();
        link(&db, "s1", "full").await;

        let available = list_available(&db).await.unwrap();
        let ids: Vec<_> = available.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["idle"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_counts_idle_and_busy() {
        let (db, _dir) = setup_db().await;
        upsert_operator(&db, &operator("a", OperatorRole::Agent, true, 3))
            .await
            .unwrap();
        upsert_operator(&db, &operator("b", OperatorRole::Agent, true, 3))
            .await
            .unwrap();
        upsert_operator(&db, &operator("c", OperatorRole::Agent, false, 3))
            .await
            .unwrap();
        link(&db, "s1", "a").await;

        let snap = pool_snapshot(&db).await.unwrap();
        assert_eq!(snap, PoolSnapshot { online: 2, idle: 1, busy: 1 });

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn escalation_contacts_are_supervisors_and_managers() {
        let (db, _dir) = setup_db().await;
        upsert_operator(&db, &operator("agent", OperatorRole::Agent, true, 3))
            .await
            .unwrap();
        upsert_operator(&db, &operator("sup", OperatorRole::Supervisor, false, 3))
            .await
            .unwrap();
        upsert_operator(&db, &operator("mgr", OperatorRole::Manager, true, 3))
            .await
            .unwrap();

        let contacts = list_escalation_contacts(&db).await.unwrap();
        let ids: Vec<_> = contacts.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"sup"));
        assert!(ids.contains(&"mgr"));

        db.close().await.unwrap();
    }
}
