// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine facade wiring queue, SLA, escalation, and inactivity together.
//!
//! The surrounding chat system calls in at three points: when a user asks
//! for a human, when an operator frees up, and when a user message arrives.
//! Everything else happens on background sweeps.

use std::sync::Arc;

use chrono::Utc;
use handoff_config::model::HandoffConfig;
use handoff_core::HandoffError;
use handoff_core::traits::{Notifier, Ticketing};
use handoff_core::types::{
    AssignmentOutcome, EscalationResult, Priority, SessionStatus, SlaEntityType,
};
use handoff_storage::Database;
use handoff_storage::queries::{operators, queue, sessions};
use tracing::{info, warn};

use crate::escalation::EscalationManager;
use crate::inactivity::{InactivityMonitor, InactivitySweep};
use crate::metrics::{QueueStats, Reporter, SlaMetrics};
use crate::queue::QueueManager;
use crate::sla::SlaTracker;
use crate::state_machine::can_transition;

/// How a closed session ended, from the operator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Resolved,
    NotResolved,
    Ended,
}

pub struct HandoffEngine {
    db: Arc<Database>,
    queue: QueueManager,
    sla: Arc<SlaTracker>,
    escalation: EscalationManager,
    inactivity: InactivityMonitor,
    reporter: Reporter,
}

impl HandoffEngine {
    pub fn new(
        db: Arc<Database>,
        config: &HandoffConfig,
        notifier: Arc<dyn Notifier>,
        ticketing: Arc<dyn Ticketing>,
    ) -> Self {
        let sla = Arc::new(SlaTracker::new(db.clone(), config.sla.clone()));
        Self {
            queue: QueueManager::new(db.clone(), config.queue.clone(), notifier.clone()),
            escalation: EscalationManager::new(
                db.clone(),
                notifier,
                ticketing,
                sla.clone(),
            ),
            inactivity: InactivityMonitor::new(db.clone(), config.inactivity.clone()),
            reporter: Reporter::new(db.clone()),
            sla,
            db,
        }
    }

    /// A user asked for a human. Hands the session to an available operator
    /// immediately when one has capacity and the skills, otherwise queues it.
    pub async fn on_escalation_requested(
        &self,
        session_id: &str,
        priority: Priority,
        required_skills: Vec<String>,
    ) -> Result<EscalationResult, HandoffError> {
        let session = sessions::get_session(&self.db, session_id)
            .await?
            .ok_or(HandoffError::NotFound {
                entity: "session",
                id: session_id.to_string(),
            })?;
        if session.status.is_terminal() {
            return Err(HandoffError::InvalidTransition {
                from: session.status.to_string(),
                to: SessionStatus::WaitingOperator.to_string(),
            });
        }

        self.sla
            .create(session_id, SlaEntityType::Session, priority, "handoff")
            .await?;

        if let Some(operator) = self.pick_operator(&required_skills).await? {
            if can_transition(session.status, SessionStatus::WithOperator) {
                let moved = sessions::update_status_from(
                    &self.db,
                    session_id,
                    session.status,
                    SessionStatus::WithOperator,
                )
                .await?;
                if moved {
                    sessions::link_operator(&self.db, session_id, &operator.id).await?;
                    if let Some(outcome) = self
                        .sla
                        .record_response(session_id, SlaEntityType::Session)
                        .await?
                    {
                        if !outcome.on_time {
                            self.escalation.handle_violation(&outcome.record).await?;
                        }
                    }
                    info!(session_id, operator_id = %operator.id, "session handed off directly");
                    return Ok(EscalationResult::Assigned {
                        operator_id: operator.id,
                    });
                }
            }
        }

        if session.status == SessionStatus::Active {
            sessions::update_status_from(
                &self.db,
                session_id,
                SessionStatus::Active,
                SessionStatus::WaitingOperator,
            )
            .await?;
        }

        let placement = self
            .queue
            .add_to_queue(session_id, priority, required_skills)
            .await?;
        Ok(EscalationResult::Queued {
            queue_id: placement.queue_id,
            position: placement.position,
            estimated_wait_minutes: placement.estimated_wait_minutes,
            already_in_queue: placement.already_in_queue,
        })
    }

    /// An operator came online or finished a chat. Claims the next eligible
    /// entry, hands over the session, and stamps the SLA first response.
    pub async fn on_operator_available(
        &self,
        operator_id: &str,
    ) -> Result<AssignmentOutcome, HandoffError> {
        let operator = operators::get_operator(&self.db, operator_id)
            .await?
            .ok_or(HandoffError::NotFound {
                entity: "operator",
                id: operator_id.to_string(),
            })?;
        if !operator.online {
            operators::set_online(&self.db, operator_id, true).await?;
        }

        let Some(entry) = self.queue.assign_next(&operator).await? else {
            return Ok(AssignmentOutcome::QueueEmpty);
        };

        let session_id = entry.session_id.clone();
        if let Some(session) = sessions::get_session(&self.db, &session_id).await? {
            if can_transition(session.status, SessionStatus::WithOperator) {
                sessions::update_status_from(
                    &self.db,
                    &session_id,
                    session.status,
                    SessionStatus::WithOperator,
                )
                .await?;
            }
        }
        sessions::link_operator(&self.db, &session_id, operator_id).await?;

        if let Some(outcome) = self
            .sla
            .record_response(&session_id, SlaEntityType::Session)
            .await?
        {
            if !outcome.on_time {
                self.escalation.handle_violation(&outcome.record).await?;
            }
        }

        let wait_minutes = (Utc::now() - entry.entered_at).num_minutes();
        Ok(AssignmentOutcome::Assigned {
            session_id,
            wait_minutes,
        })
    }

    /// A user message arrived. Refreshes activity tracking and brings a
    /// parked session back to life.
    pub async fn on_user_message(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionStatus>, HandoffError> {
        sessions::touch_activity(&self.db, session_id).await?;
        self.inactivity.reactivate(session_id).await
    }

    /// An operator (or the user) closed the chat.
    pub async fn on_session_closed(
        &self,
        session_id: &str,
        outcome: CloseOutcome,
    ) -> Result<(), HandoffError> {
        let session = sessions::get_session(&self.db, session_id)
            .await?
            .ok_or(HandoffError::NotFound {
                entity: "session",
                id: session_id.to_string(),
            })?;
        let target = match outcome {
            CloseOutcome::Resolved => SessionStatus::Resolved,
            CloseOutcome::NotResolved => SessionStatus::NotResolved,
            CloseOutcome::Ended => SessionStatus::Ended,
        };
        if !can_transition(session.status, target) {
            return Err(HandoffError::InvalidTransition {
                from: session.status.to_string(),
                to: target.to_string(),
            });
        }
        sessions::update_status(&self.db, session_id, target).await?;
        sessions::unlink_operator(&self.db, session_id).await?;
        self.queue.remove_from_queue(session_id, "session closed").await?;
        self.sla.resolve(session_id, SlaEntityType::Session).await?;
        info!(session_id, status = %target, "session closed");
        Ok(())
    }

    /// One SLA pass: flip due records and escalate each fresh violation.
    pub async fn run_sla_sweep(&self) -> Result<usize, HandoffError> {
        let outcome = self.sla.sweep().await?;
        for record in &outcome.warned {
            warn!(
                entity_id = %record.entity_id,
                priority = %record.priority,
                response_deadline = %record.response_deadline,
                "sla warning threshold reached"
            );
            if record.entity_type == SlaEntityType::Session {
                queue::mark_sla_notified(&self.db, &record.entity_id, false).await?;
            }
        }
        let mut escalated = 0;
        for record in &outcome.violated {
            if record.entity_type == SlaEntityType::Session {
                queue::mark_sla_notified(&self.db, &record.entity_id, true).await?;
            }
            // One bad escalation must not starve the rest of the batch.
            match self.escalation.handle_violation(record).await {
                Ok(()) => escalated += 1,
                Err(error) => {
                    warn!(entity_id = %record.entity_id, %error, "escalation failed");
                }
            }
        }
        Ok(escalated)
    }

    /// One inactivity pass.
    pub async fn run_inactivity_sweep(&self) -> Result<InactivitySweep, HandoffError> {
        self.inactivity.sweep().await
    }

    /// One stale-entry cleanup pass.
    pub async fn run_cleanup_sweep(&self) -> Result<usize, HandoffError> {
        self.queue.cleanup_stale_entries().await
    }

    pub async fn queue_position(&self, session_id: &str) -> Result<Option<usize>, HandoffError> {
        self.queue.position(session_id).await
    }

    pub async fn queue_stats(&self) -> Result<QueueStats, HandoffError> {
        self.reporter.queue_stats().await
    }

    pub async fn sla_metrics(&self, window_days: i64) -> Result<SlaMetrics, HandoffError> {
        self.reporter.sla_metrics(window_days).await
    }

    /// First online operator with spare capacity matching the skill set.
    async fn pick_operator(
        &self,
        required_skills: &[String],
    ) -> Result<Option<handoff_core::types::Operator>, HandoffError> {
        let available = operators::list_available(&self.db).await?;
        Ok(available.into_iter().find(|op| {
            required_skills.is_empty()
                || required_skills.iter().any(|s| op.skills.contains(s))
        }))
    }
}
