// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle state machine.
//!
//! A fixed adjacency table over [`SessionStatus`]; transitions outside it are
//! rejected. The machine itself is pure bookkeeping: it validates edges and
//! appends to an in-memory history, and callers persist the new status.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use handoff_core::types::SessionStatus;

/// Whether `from -> to` is a legal edge.
///
/// Resolved, Cancelled, and Ended are terminal. A session must pass through
/// `WithOperator` to reach `Resolved`; the bot cannot resolve on its own.
pub fn can_transition(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;
    if from == to {
        return false;
    }
    match from {
        Active => matches!(
            to,
            WithOperator | WaitingOperator | RequestingTicket | Cancelled | Ended
        ),
        WaitingOperator => matches!(to, WithOperator | Active | Cancelled | Ended),
        WithOperator => matches!(
            to,
            Active | WaitingClient | RequestingTicket | Resolved | NotResolved | Cancelled | Ended
        ),
        WaitingClient => matches!(to, WithOperator | Active | Cancelled | Ended),
        RequestingTicket => matches!(to, Active | WithOperator | Cancelled | Ended),
        NotResolved => matches!(to, Active | WaitingOperator | Cancelled | Ended),
        Resolved | Cancelled | Ended => false,
    }
}

/// One applied transition, for audit.
#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub state: SessionStatus,
    pub previous: SessionStatus,
    pub at: DateTime<Utc>,
    pub metadata: Option<String>,
}

/// Tracks one session's status and the transitions it has taken.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    current: SessionStatus,
    history: Vec<TransitionRecord>,
}

impl SessionStateMachine {
    pub fn new(initial: SessionStatus) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> SessionStatus {
        self.current
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// Apply a transition, or fail with [`HandoffError::InvalidTransition`]
    /// when the edge is not in the table.
    pub fn transition(
        &mut self,
        to: SessionStatus,
        metadata: Option<String>,
    ) -> Result<(), HandoffError> {
        if !can_transition(self.current, to) {
            return Err(HandoffError::InvalidTransition {
                from: self.current.to_string(),
                to: to.to_string(),
            });
        }
        self.history.push(TransitionRecord {
            state: to,
            previous: self.current,
            at: Utc::now(),
            metadata,
        });
        self.current = to;
        Ok(())
    }
}
