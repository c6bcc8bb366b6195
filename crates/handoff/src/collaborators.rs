// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default collaborator implementations.
//!
//! Delivery transports and ticket systems live outside this process, so the
//! standalone binary ships collaborators that emit structured tracing
//! events. Downstream systems tail these, or replace the collaborators
//! entirely when embedding the engine.

use async_trait::async_trait;
use handoff_core::HandoffError;
use handoff_core::traits::{EscalationTicket, Notifier, QueueEvent, Ticketing};
use handoff_core::types::Priority;
use tracing::info;

/// Notifier that logs every event as a structured tracing event.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_operator(
        &self,
        operator_id: &str,
        event: QueueEvent,
    ) -> Result<(), HandoffError> {
        info!(target: "handoff::notify", operator_id, ?event, "operator notification");
        Ok(())
    }

    async fn notify_session(
        &self,
        session_id: &str,
        event: QueueEvent,
    ) -> Result<(), HandoffError> {
        info!(target: "handoff::notify", session_id, ?event, "session notification");
        Ok(())
    }

    async fn broadcast(&self, event: QueueEvent) -> Result<(), HandoffError> {
        info!(target: "handoff::notify", ?event, "broadcast notification");
        Ok(())
    }
}

/// Ticketing collaborator that logs escalations instead of filing them.
pub struct LogTicketing;

#[async_trait]
impl Ticketing for LogTicketing {
    async fn create_ticket(&self, ticket: EscalationTicket) -> Result<String, HandoffError> {
        let id = uuid::Uuid::new_v4().to_string();
        info!(
            target: "handoff::ticketing",
            ticket_id = %id,
            subject = %ticket.subject,
            priority = %ticket.priority,
            entity_id = %ticket.entity_id,
            "escalation ticket raised"
        );
        Ok(id)
    }

    async fn upgrade_priority(
        &self,
        ticket_id: &str,
        priority: Priority,
    ) -> Result<(), HandoffError> {
        info!(
            target: "handoff::ticketing",
            ticket_id,
            %priority,
            "ticket priority upgraded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_collaborators_always_succeed() {
        let notifier = LogNotifier;
        notifier
            .broadcast(QueueEvent::SessionQueued {
                session_id: "s1".to_string(),
                priority: Priority::High,
                position: 1,
            })
            .await
            .unwrap();

        let ticketing = LogTicketing;
        let id = ticketing
            .create_ticket(EscalationTicket {
                subject: "x".to_string(),
                description: "y".to_string(),
                priority: Priority::Urgent,
                entity_id: "s1".to_string(),
            })
            .await
            .unwrap();
        assert!(!id.is_empty());
    }
}
