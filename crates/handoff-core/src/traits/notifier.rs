// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier trait for pushing queue and SLA events to operators and sessions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HandoffError;
use crate::types::Priority;

/// An event pushed to a specific operator, a session, or broadcast to all
/// available operators. Delivery is best-effort with no acknowledgment
/// protocol; the engine never blocks on the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    /// A session entered the queue and operators should consider logging in.
    SessionQueued {
        session_id: String,
        priority: Priority,
        position: usize,
    },
    /// A session's 1-based queue position changed.
    PositionChanged {
        session_id: String,
        position: usize,
        estimated_wait_minutes: i64,
    },
    /// A session was assigned to an operator.
    SessionAssigned {
        session_id: String,
        operator_id: String,
    },
    /// An SLA deadline was breached; sent to supervisors and managers.
    SlaViolated {
        entity_id: String,
        priority: Priority,
        detail: String,
    },
}

/// Push collaborator for queue and SLA events.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Push an event to a single operator.
    async fn notify_operator(
        &self,
        operator_id: &str,
        event: QueueEvent,
    ) -> Result<(), HandoffError>;

    /// Push an event to the session's client-facing channel.
    async fn notify_session(&self, session_id: &str, event: QueueEvent)
    -> Result<(), HandoffError>;

    /// Broadcast an event to all available operators.
    async fn broadcast(&self, event: QueueEvent) -> Result<(), HandoffError>;
}
