// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticketing trait for escalation ticket creation on SLA breach.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HandoffError;
use crate::types::Priority;

/// A ticket raised by the escalation manager when an SLA is breached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationTicket {
    pub subject: String,
    pub description: String,
    /// Escalation tickets for resolution breaches are always `Urgent`.
    pub priority: Priority,
    /// The session or ticket that breached its SLA.
    pub entity_id: String,
}

/// Ticket-creation collaborator. The surrounding system owns ticket CRUD;
/// the engine only raises escalations.
#[async_trait]
pub trait Ticketing: Send + Sync {
    /// Create an escalation ticket, returning its id.
    async fn create_ticket(&self, ticket: EscalationTicket) -> Result<String, HandoffError>;

    /// Upgrade the priority of an existing ticket.
    async fn upgrade_priority(
        &self,
        ticket_id: &str,
        priority: Priority,
    ) -> Result<(), HandoffError>;
}
