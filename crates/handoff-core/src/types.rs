// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model for queue entries, SLA records, sessions, and operators.
//!
//! Enums carry their wire form (snake_case text in SQLite and JSON) via
//! strum's `Display`/`EnumString` plus serde. Timestamps are `chrono`
//! UTC instants, stored as RFC 3339 text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Priority rank driving both queue ordering and deadline selection.
///
/// Ordinal order is `Low < Medium < High < Urgent`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Numeric rank: urgent=4 > high=3 > medium=2 > low=1.
    pub fn rank(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    /// Inverse of [`rank`](Self::rank); storage keeps the numeric form so
    /// SQL can order on it.
    pub fn from_rank(rank: i64) -> Option<Priority> {
        match rank {
            1 => Some(Priority::Low),
            2 => Some(Priority::Medium),
            3 => Some(Priority::High),
            4 => Some(Priority::Urgent),
            _ => None,
        }
    }

    /// The next priority up, saturating at `Urgent`.
    pub fn escalated(self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High | Priority::Urgent => Priority::Urgent,
        }
    }
}

/// Lifecycle status of a queue entry. Entries are never deleted, only
/// status-transitioned, forming an append-only history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Assigned,
    Cancelled,
    Timeout,
}

impl QueueStatus {
    /// A live entry counts against the one-entry-per-session invariant.
    pub fn is_live(self) -> bool {
        matches!(self, QueueStatus::Waiting | QueueStatus::Assigned)
    }
}

/// Status of an SLA deadline record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    Active,
    Warning,
    Violated,
    Completed,
}

/// The kind of entity an SLA record tracks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SlaEntityType {
    Session,
    Ticket,
}

/// Chat session status governed by the session state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    WithOperator,
    WaitingClient,
    WaitingOperator,
    RequestingTicket,
    Resolved,
    NotResolved,
    Cancelled,
    Ended,
}

impl SessionStatus {
    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Resolved | SessionStatus::Cancelled | SessionStatus::Ended
        )
    }

    /// A session in one of these states should no longer hold a waiting
    /// queue entry; `cleanup_stale_entries` cancels orphans.
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            SessionStatus::Resolved
                | SessionStatus::NotResolved
                | SessionStatus::Cancelled
                | SessionStatus::Ended
        )
    }
}

/// Operator role; supervisors and managers receive violation notifications.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperatorRole {
    Agent,
    Supervisor,
    Manager,
}

/// Who authored a session message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Operator,
    System,
}

/// A persisted record of a session awaiting (or assigned to) a human operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub session_id: String,
    pub priority: Priority,
    /// Skills an operator must intersect to take this entry. Empty = anyone.
    pub required_skills: Vec<String>,
    pub status: QueueStatus,
    pub entered_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub estimated_wait_minutes: i64,
    pub sla_warning_notified: bool,
    pub sla_violation_notified: bool,
}

impl QueueEntry {
    /// Create a new waiting entry for a session.
    pub fn new(
        session_id: impl Into<String>,
        priority: Priority,
        required_skills: Vec<String>,
        estimated_wait_minutes: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            priority,
            required_skills,
            status: QueueStatus::Waiting,
            entered_at: Utc::now(),
            assigned_at: None,
            assigned_to: None,
            cancelled_at: None,
            cancel_reason: None,
            estimated_wait_minutes,
            sla_warning_notified: false,
            sla_violation_notified: false,
        }
    }
}

/// Deadline-tracking record for first-response and resolution service levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaRecord {
    pub id: String,
    pub entity_id: String,
    pub entity_type: SlaEntityType,
    pub priority: Priority,
    pub category: String,
    pub status: SlaStatus,
    pub created_at: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
    pub warning_threshold: DateTime<Utc>,
    pub first_response_at: Option<DateTime<Utc>>,
    pub response_on_time: Option<bool>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_on_time: Option<bool>,
    pub total_resolution_minutes: Option<i64>,
    pub violated_at: Option<DateTime<Utc>>,
}

/// A chat session. This engine governs only the `status` field; everything
/// else belongs to the surrounding chat system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub channel: String,
    pub user_id: Option<String>,
    pub status: SessionStatus,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A human operator in the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub role: OperatorRole,
    pub skills: Vec<String>,
    pub online: bool,
    pub active: bool,
    pub max_sessions: i64,
    pub created_at: DateTime<Utc>,
}

/// A message within a session; user messages drive inactivity reactivation,
/// system messages explain engine-driven status changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: String,
    pub session_id: String,
    pub sender: MessageSender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    /// Create a system message explaining an engine action.
    pub fn system(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            sender: MessageSender::System,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Outcome of an escalation request: either an operator took the session
/// immediately, or it was queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EscalationResult {
    Assigned {
        operator_id: String,
    },
    Queued {
        queue_id: String,
        /// 1-based rank among waiting entries. `None` when the entry is
        /// already assigned to an operator and no longer holds a rank.
        position: Option<usize>,
        estimated_wait_minutes: i64,
        /// True when the session already had a live entry and no new row
        /// was created.
        already_in_queue: bool,
    },
}

/// Outcome of pulling the next eligible entry for an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned {
        session_id: String,
        /// Minutes the session waited in the queue.
        wait_minutes: i64,
    },
    /// No waiting entry matched the operator's skills.
    QueueEmpty,
}
