// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation handling for SLA breaches.
//!
//! Callers feed this the records a sweep freshly flipped; the exactly-once
//! guarantee lives in the sweep, so every record arriving here gets exactly
//! one escalation. Ticket creation failures propagate (the tick retries
//! nothing; the record stays violated either way), notification failures
//! are logged and swallowed.

use std::sync::Arc;

use chrono::Utc;
use handoff_core::HandoffError;
use handoff_core::traits::{EscalationTicket, Notifier, QueueEvent, Ticketing};
use handoff_core::types::{Priority, SlaEntityType, SlaRecord};
use handoff_storage::Database;
use handoff_storage::queries::operators;
use tracing::{info, warn};

use crate::sla::SlaTracker;

/// Which deadline a violated record missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Response,
    Resolution,
}

/// A violated record missed its response deadline when no first response
/// was ever stamped; otherwise the resolution deadline is the one that fell.
pub fn classify(record: &SlaRecord) -> ViolationKind {
    if record.first_response_at.is_none() {
        ViolationKind::Response
    } else {
        ViolationKind::Resolution
    }
}

pub struct EscalationManager {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    ticketing: Arc<dyn Ticketing>,
    sla: Arc<SlaTracker>,
}

impl EscalationManager {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn Notifier>,
        ticketing: Arc<dyn Ticketing>,
        sla: Arc<SlaTracker>,
    ) -> Self {
        Self {
            db,
            notifier,
            ticketing,
            sla,
        }
    }

    /// Escalate one freshly violated record.
    pub async fn handle_violation(&self, record: &SlaRecord) -> Result<(), HandoffError> {
        match classify(record) {
            ViolationKind::Response => self.handle_response_violation(record).await,
            ViolationKind::Resolution => self.handle_resolution_violation(record).await,
        }
    }

    /// A missed first response. Tickets get their priority bumped one rank
    /// in place; sessions get an escalation ticket so a human follows up.
    async fn handle_response_violation(&self, record: &SlaRecord) -> Result<(), HandoffError> {
        let detail = format!(
            "first response overdue since {}",
            record.response_deadline.to_rfc3339()
        );
        match record.entity_type {
            SlaEntityType::Ticket => {
                let upgraded = record.priority.escalated();
                self.sla
                    .upgrade(&record.entity_id, SlaEntityType::Ticket, upgraded)
                    .await?;
                self.ticketing
                    .upgrade_priority(&record.entity_id, upgraded)
                    .await?;
                info!(
                    entity_id = %record.entity_id,
                    from = %record.priority,
                    to = %upgraded,
                    "ticket priority escalated after missed response"
                );
            }
            SlaEntityType::Session => {
                let ticket_id = self
                    .ticketing
                    .create_ticket(EscalationTicket {
                        subject: format!("Missed response SLA for session {}", record.entity_id),
                        description: detail.clone(),
                        priority: record.priority.escalated(),
                        entity_id: record.entity_id.clone(),
                    })
                    .await?;
                info!(
                    entity_id = %record.entity_id,
                    ticket_id,
                    "escalation ticket raised after missed response"
                );
            }
        }
        self.notify_contacts(record, &detail).await;
        Ok(())
    }

    /// A missed resolution deadline always raises an urgent ticket naming
    /// how long the entity has been open.
    async fn handle_resolution_violation(&self, record: &SlaRecord) -> Result<(), HandoffError> {
        let elapsed_minutes = (Utc::now() - record.created_at).num_minutes();
        let detail = format!("unresolved after {elapsed_minutes} minutes");
        let ticket_id = self
            .ticketing
            .create_ticket(EscalationTicket {
                subject: format!(
                    "Missed resolution SLA for {} {}",
                    record.entity_type, record.entity_id
                ),
                description: detail.clone(),
                priority: Priority::Urgent,
                entity_id: record.entity_id.clone(),
            })
            .await?;
        info!(
            entity_id = %record.entity_id,
            ticket_id,
            elapsed_minutes,
            "urgent escalation ticket raised after missed resolution"
        );
        self.notify_contacts(record, &detail).await;
        Ok(())
    }

    /// Best-effort push to every supervisor and manager.
    async fn notify_contacts(&self, record: &SlaRecord, detail: &str) {
        let contacts = match operators::list_escalation_contacts(&self.db).await {
            Ok(contacts) => contacts,
            Err(error) => {
                warn!(%error, "could not list escalation contacts");
                return;
            }
        };
        for contact in contacts {
            let event = QueueEvent::SlaViolated {
                entity_id: record.entity_id.clone(),
                priority: record.priority,
                detail: detail.to_string(),
            };
            if let Err(error) = self.notifier.notify_operator(&contact.id, event).await {
                warn!(operator_id = %contact.id, %error, "violation notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use handoff_config::model::SlaConfig;
    use handoff_core::types::{Operator, OperatorRole, SlaStatus};
    use handoff_test_utils::{MockNotifier, MockTicketing};
    use tempfile::tempdir;
    use uuid::Uuid;

    async fn setup() -> (
        Arc<Database>,
        Arc<MockNotifier>,
        Arc<MockTicketing>,
        EscalationManager,
        tempfile::TempDir,
    ) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());
        let notifier = Arc::new(MockNotifier::new());
        let ticketing = Arc::new(MockTicketing::new());
        let sla = Arc::new(SlaTracker::new(db.clone(), SlaConfig::default()));
        let manager = EscalationManager::new(db.clone(), notifier.clone(), ticketing.clone(), sla);
        (db, notifier, ticketing, manager, dir)
    }

    fn violated(entity_id: &str, entity_type: SlaEntityType, responded: bool) -> SlaRecord {
        let created = Utc::now() - Duration::minutes(90);
        SlaRecord {
            id: Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            entity_type,
            priority: Priority::High,
            category: "general".to_string(),
            status: SlaStatus::Violated,
            created_at: created,
            response_deadline: created + Duration::minutes(5),
            resolution_deadline: created + Duration::minutes(60),
            warning_threshold: created + Duration::minutes(4),
            first_response_at: responded.then(|| created + Duration::minutes(3)),
            response_on_time: responded.then_some(true),
            resolved_at: None,
            resolution_on_time: None,
            total_resolution_minutes: None,
            violated_at: Some(Utc::now()),
        }
    }

    async fn seed_supervisor(db: &Database, id: &str) {
        handoff_storage::queries::operators::upsert_operator(
            db,
            &Operator {
                id: id.to_string(),
                name: id.to_string(),
                role: OperatorRole::Supervisor,
                skills: vec![],
                online: true,
                active: true,
                max_sessions: 3,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    }

    #[test]
    fn classification_follows_first_response() {
        assert_eq!(
            classify(&violated("x", SlaEntityType::Session, false)),
            ViolationKind::Response
        );
        assert_eq!(
            classify(&violated("x", SlaEntityType::Session, true)),
            ViolationKind::Resolution
        );
    }

    #[tokio::test]
    async fn session_response_violation_raises_ticket() {
        let (db, notifier, ticketing, manager, _dir) = setup().await;
        seed_supervisor(&db, "sup-1").await;

        let record = violated("s1", SlaEntityType::Session, false);
        manager.handle_violation(&record).await.unwrap();

        let tickets = ticketing.created().await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].entity_id, "s1");
        assert_eq!(tickets[0].priority, Priority::Urgent, "high escalates to urgent");

        let events = notifier.operator_events().await;
        assert!(events.iter().any(|(id, event)| {
            id == "sup-1" && matches!(event, QueueEvent::SlaViolated { .. })
        }));
    }

    #[tokio::test]
    async fn ticket_response_violation_upgrades_in_place() {
        let (db, _notifier, ticketing, manager, _dir) = setup().await;

        // The ticket's own open record, which the upgrade should retime.
        let sla = SlaTracker::new(db.clone(), SlaConfig::default());
        sla.create("t1", SlaEntityType::Ticket, Priority::High, "billing")
            .await
            .unwrap();

        let record = violated("t1", SlaEntityType::Ticket, false);
        manager.handle_violation(&record).await.unwrap();

        assert!(ticketing.created().await.is_empty(), "no new ticket for tickets");
        let upgrades = ticketing.upgrades().await;
        assert_eq!(upgrades, vec![("t1".to_string(), Priority::Urgent)]);

        let open = handoff_storage::queries::sla::open_record(&db, "t1", SlaEntityType::Ticket)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(open.priority, Priority::Urgent);
    }

    #[tokio::test]
    async fn resolution_violation_is_always_urgent() {
        let (_db, _notifier, ticketing, manager, _dir) = setup().await;

        let record = violated("s1", SlaEntityType::Session, true);
        manager.handle_violation(&record).await.unwrap();

        let tickets = ticketing.created().await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].priority, Priority::Urgent);
        assert!(tickets[0].description.contains("minutes"));
    }
}
