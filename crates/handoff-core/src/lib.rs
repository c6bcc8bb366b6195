// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Handoff engine.
//!
//! Provides the error type, the domain model (queue entries, SLA records,
//! sessions, operators), and the collaborator traits the engine calls out
//! through. Everything else in the workspace builds on this crate.

pub mod error;
pub mod traits;
pub mod types;

pub use error::HandoffError;
pub use traits::{EscalationTicket, Notifier, QueueEvent, Ticketing};
pub use types::{
    AssignmentOutcome, ChatSession, EscalationResult, MessageSender, Operator, OperatorRole,
    Priority, QueueEntry, QueueStatus, SessionMessage, SessionStatus, SlaEntityType, SlaRecord,
    SlaStatus,
};
