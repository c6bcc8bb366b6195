// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session rows and operator-session links.
//!
//! The engine owns only the `status` and `last_activity` columns of a
//! session; everything else is written once at creation by the chat layer.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use handoff_core::types::{ChatSession, SessionStatus};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{SESSION_COLUMNS, session_from_row};

pub async fn create_session(db: &Database, session: &ChatSession) -> Result<(), HandoffError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, channel, user_id, status, last_activity, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session.id,
                    session.channel,
                    session.user_id,
                    session.status.to_string(),
                    session.last_activity,
                    session.created_at,
                    session.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_session(db: &Database, id: &str) -> Result<Option<ChatSession>, HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            );
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Unconditionally set a session's status. Transition legality is checked
/// by the engine's state machine before this is called.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: SessionStatus,
) -> Result<(), HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sessions SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_string(), Utc::now(), id],
            )?;
            if changed == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Compare-and-set a session's status. Returns `false` when the session
/// was no longer in `from`, which means another path transitioned it first.
pub async fn update_status_from(
    db: &Database,
    id: &str,
    from: SessionStatus,
    to: SessionStatus,
) -> Result<bool, HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sessions SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4",
                params![to.to_string(), Utc::now(), id, from.to_string()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bump `last_activity` to now.
pub async fn touch_activity(db: &Database, id: &str) -> Result<(), HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET last_activity = ?1, updated_at = ?1 WHERE id = ?2",
                params![Utc::now(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Operator-held sessions whose last activity predates `cutoff`. These are
/// the idle-warning candidates.
pub async fn list_idle_with_operator(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<ChatSession>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE status = 'with_operator' AND last_activity < ?1
                 ORDER BY last_activity ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], session_from_row)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sessions parked in `waiting_client` whose last activity predates
/// `cutoff`. These are considered abandoned.
pub async fn list_abandoned(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<ChatSession>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE status = 'waiting_client' AND last_activity < ?1
                 ORDER BY last_activity ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], session_from_row)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bot-only `active` sessions with no open operator link whose last
/// activity predates `cutoff`. These are abandoned without ever reaching
/// an operator.
pub async fn list_stale_unattended(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<ChatSession>, HandoffError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions s
                 WHERE s.status = 'active' AND s.last_activity < ?1
                   AND NOT EXISTS (
                       SELECT 1 FROM operator_sessions os
                       WHERE os.session_id = s.id AND os.unlinked_at IS NULL
                   )
                 ORDER BY s.last_activity ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], session_from_row)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Link an operator to a session. The pair stays in history; `unlinked_at`
/// marks the link closed.
pub async fn link_operator(
    db: &Database,
    session_id: &str,
    operator_id: &str,
) -> Result<(), HandoffError> {
    let session_id = session_id.to_string();
    let operator_id = operator_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO operator_sessions (id, session_id, operator_id, linked_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![Uuid::new_v4().to_string(), session_id, operator_id, Utc::now()],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Close any open operator link for a session.
pub async fn unlink_operator(db: &Database, session_id: &str) -> Result<(), HandoffError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE operator_sessions SET unlinked_at = ?1
                 WHERE session_id = ?2 AND unlinked_at IS NULL",
                params![Utc::now(), session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The operator currently linked to a session, if any.
pub async fn operator_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Option<String>, HandoffError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT operator_id FROM operator_sessions
                 WHERE session_id = ?1 AND unlinked_at IS NULL",
                params![session_id],
                |row| row.get(0),
            );
            match result {
                Ok(id) => Ok(Some(id)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
