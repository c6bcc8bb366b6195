// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The engine talks to the surrounding chat system through these seams:
//! a [`Notifier`] for pushing events to operators and sessions, and a
//! [`Ticketing`] collaborator for escalation ticket creation. Both use
//! `#[async_trait]` for dynamic dispatch.

pub mod notifier;
pub mod ticketing;

pub use notifier::{Notifier, QueueEvent};
pub use ticketing::{EscalationTicket, Ticketing};
