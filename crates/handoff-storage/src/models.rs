// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the domain types in `handoff-core`.
//!
//! Enums travel as their snake_case text form, priorities as their numeric
//! rank (so SQL can order on them), skill sets as JSON arrays, and
//! timestamps as RFC 3339 text via rusqlite's chrono integration.

use std::str::FromStr;

use handoff_core::types::{
    ChatSession, MessageSender, Operator, OperatorRole, Priority, QueueEntry, QueueStatus,
    SessionMessage, SessionStatus, SlaEntityType, SlaRecord, SlaStatus,
};
use rusqlite::Row;
use rusqlite::types::Type;

/// Parse an enum stored as text, surfacing failures as conversion errors
/// on the originating column.
pub(crate) fn parse_text<T>(idx: usize, text: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a numeric priority rank.
pub(crate) fn parse_priority(idx: usize, rank: i64) -> Result<Priority, rusqlite::Error> {
    Priority::from_rank(rank).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("priority rank out of range: {rank}").into(),
        )
    })
}

/// Parse a JSON array of skills.
pub(crate) fn parse_skills(idx: usize, json: String) -> Result<Vec<String>, rusqlite::Error> {
    serde_json::from_str(&json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Serialize a skill set for storage.
pub(crate) fn skills_to_json(skills: &[String]) -> String {
    serde_json::to_string(skills).unwrap_or_else(|_| "[]".to_string())
}

/// Map a `queue_entries` row selected with [`QUEUE_ENTRY_COLUMNS`].
pub(crate) fn queue_entry_from_row(row: &Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    Ok(QueueEntry {
        id: row.get(0)?,
        session_id: row.get(1)?,
        priority: parse_priority(2, row.get(2)?)?,
        required_skills: parse_skills(3, row.get(3)?)?,
        status: parse_text::<QueueStatus>(4, row.get(4)?)?,
        entered_at: row.get(5)?,
        assigned_at: row.get(6)?,
        assigned_to: row.get(7)?,
        cancelled_at: row.get(8)?,
        cancel_reason: row.get(9)?,
        estimated_wait_minutes: row.get(10)?,
        sla_warning_notified: row.get(11)?,
        sla_violation_notified: row.get(12)?,
    })
}

pub(crate) const QUEUE_ENTRY_COLUMNS: &str = "id, session_id, priority, required_skills, status, \
     entered_at, assigned_at, assigned_to, cancelled_at, cancel_reason, \
     estimated_wait_minutes, sla_warning_notified, sla_violation_notified";

/// Map an `sla_records` row selected with [`SLA_RECORD_COLUMNS`].
pub(crate) fn sla_record_from_row(row: &Row<'_>) -> Result<SlaRecord, rusqlite::Error> {
    Ok(SlaRecord {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        entity_type: parse_text::<SlaEntityType>(2, row.get(2)?)?,
        priority: parse_priority(3, row.get(3)?)?,
        category: row.get(4)?,
        status: parse_text::<SlaStatus>(5, row.get(5)?)?,
        created_at: row.get(6)?,
        response_deadline: row.get(7)?,
        resolution_deadline: row.get(8)?,
        warning_threshold: row.get(9)?,
        first_response_at: row.get(10)?,
        response_on_time: row.get(11)?,
        resolved_at: row.get(12)?,
        resolution_on_time: row.get(13)?,
        total_resolution_minutes: row.get(14)?,
        violated_at: row.get(15)?,
    })
}

pub(crate) const SLA_RECORD_COLUMNS: &str = "id, entity_id, entity_type, priority, category, status, created_at, \
     response_deadline, resolution_deadline, warning_threshold, \
     first_response_at, response_on_time, resolved_at, resolution_on_time, \
     total_resolution_minutes, violated_at";

/// Map a `sessions` row selected with [`SESSION_COLUMNS`].
pub(crate) fn session_from_row(row: &Row<'_>) -> Result<ChatSession, rusqlite::Error> {
    Ok(ChatSession {
        id: row.get(0)?,
        channel: row.get(1)?,
        user_id: row.get(2)?,
        status: parse_text::<SessionStatus>(3, row.get(3)?)?,
        last_activity: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) const SESSION_COLUMNS: &str =
    "id, channel, user_id, status, last_activity, created_at, updated_at";

/// Map an `operators` row selected with [`OPERATOR_COLUMNS`].
pub(crate) fn operator_from_row(row: &Row<'_>) -> Result<Operator, rusqlite::Error> {
    Ok(Operator {
        id: row.get(0)?,
        name: row.get(1)?,
        role: parse_text::<OperatorRole>(2, row.get(2)?)?,
        skills: parse_skills(3, row.get(3)?)?,
        online: row.get(4)?,
        active: row.get(5)?,
        max_sessions: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) const OPERATOR_COLUMNS: &str =
    "id, name, role, skills, online, active, max_sessions, created_at";

/// Map a `session_messages` row selected with [`MESSAGE_COLUMNS`].
pub(crate) fn message_from_row(row: &Row<'_>) -> Result<SessionMessage, rusqlite::Error> {
    Ok(SessionMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        sender: parse_text::<MessageSender>(2, row.get(2)?)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) const MESSAGE_COLUMNS: &str = "id, session_id, sender, content, created_at";
