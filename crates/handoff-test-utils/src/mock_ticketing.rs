// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording mock for the [`Ticketing`] trait.

use async_trait::async_trait;
use handoff_core::HandoffError;
use handoff_core::traits::{EscalationTicket, Ticketing};
use handoff_core::types::Priority;
use tokio::sync::Mutex;

/// Records ticket creations and priority upgrades; ids are sequential.
#[derive(Default)]
pub struct MockTicketing {
    created: Mutex<Vec<EscalationTicket>>,
    upgrades: Mutex<Vec<(String, Priority)>>,
    fail: Mutex<bool>,
}

impl MockTicketing {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failing(&self, fail: bool) {
        *self.fail.lock().await = fail;
    }

    pub async fn created(&self) -> Vec<EscalationTicket> {
        self.created.lock().await.clone()
    }

    pub async fn upgrades(&self) -> Vec<(String, Priority)> {
        self.upgrades.lock().await.clone()
    }

    async fn check_fail(&self) -> Result<(), HandoffError> {
        if *self.fail.lock().await {
            return Err(HandoffError::Ticketing {
                message: "mock ticketing set to fail".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Ticketing for MockTicketing {
    async fn create_ticket(&self, ticket: EscalationTicket) -> Result<String, HandoffError> {
        self.check_fail().await?;
        let mut created = self.created.lock().await;
        created.push(ticket);
        Ok(format!("ticket-{}", created.len()))
    }

    async fn upgrade_priority(
        &self,
        ticket_id: &str,
        priority: Priority,
    ) -> Result<(), HandoffError> {
        self.check_fail().await?;
        self.upgrades
            .lock()
            .await
            .push((ticket_id.to_string(), priority));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_sequential() {
        let ticketing = MockTicketing::new();
        let ticket = EscalationTicket {
            subject: "x".to_string(),
            description: "y".to_string(),
            priority: Priority::Urgent,
            entity_id: "s1".to_string(),
        };
        assert_eq!(ticketing.create_ticket(ticket.clone()).await.unwrap(), "ticket-1");
        assert_eq!(ticketing.create_ticket(ticket).await.unwrap(), "ticket-2");
        assert_eq!(ticketing.created().await.len(), 2);
    }
}
