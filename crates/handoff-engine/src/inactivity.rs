// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inactivity handling: parking idle attended sessions, ending abandoned
//! ones, and reactivating parked sessions when the user comes back.
//!
//! Every status flip here is a compare-and-set on the expected current
//! status, so a sweep racing a user message (or another sweep) silently
//! loses instead of clobbering the newer state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use handoff_config::model::InactivityConfig;
use handoff_core::HandoffError;
use handoff_core::types::{ChatSession, MessageSender, SessionMessage, SessionStatus};
use handoff_storage::Database;
use handoff_storage::queries::{messages, queue, sessions};
use tracing::{debug, info};

/// Sessions touched by one inactivity pass.
#[derive(Debug, Clone, Default)]
pub struct InactivitySweep {
    /// Attended sessions parked as waiting_client.
    pub parked: Vec<String>,
    /// Sessions ended as abandoned.
    pub ended: Vec<String>,
}

pub struct InactivityMonitor {
    db: Arc<Database>,
    config: InactivityConfig,
}

impl InactivityMonitor {
    pub fn new(db: Arc<Database>, config: InactivityConfig) -> Self {
        Self { db, config }
    }

    /// One inactivity pass over all sessions.
    pub async fn sweep(&self) -> Result<InactivitySweep, HandoffError> {
        let now = Utc::now();
        let idle_cutoff = now - Duration::minutes(self.config.idle_minutes);
        let abandon_cutoff = now - Duration::minutes(self.config.abandon_minutes);
        let mut outcome = InactivitySweep::default();

        // Attended sessions gone quiet: park them so the operator's slot
        // frees up while the transcript stays open.
        for session in sessions::list_idle_with_operator(&self.db, idle_cutoff).await? {
            if self.user_spoke_since(&session, idle_cutoff).await? {
                continue;
            }
            if sessions::operator_for_session(&self.db, &session.id)
                .await?
                .is_none()
            {
                continue;
            }
            let parked = sessions::update_status_from(
                &self.db,
                &session.id,
                SessionStatus::WithOperator,
                SessionStatus::WaitingClient,
            )
            .await?;
            if parked {
                messages::insert_message(
                    &self.db,
                    &SessionMessage::system(
                        &session.id,
                        "Conversation paused while waiting for you. Reply anytime to continue.",
                    ),
                )
                .await?;
                info!(session_id = %session.id, "idle session parked");
                outcome.parked.push(session.id);
            }
        }

        // Parked sessions the user never came back to.
        for session in sessions::list_abandoned(&self.db, abandon_cutoff).await? {
            let ended = sessions::update_status_from(
                &self.db,
                &session.id,
                SessionStatus::WaitingClient,
                SessionStatus::Ended,
            )
            .await?;
            if ended {
                sessions::unlink_operator(&self.db, &session.id).await?;
                messages::insert_message(
                    &self.db,
                    &SessionMessage::system(&session.id, "Conversation closed due to inactivity."),
                )
                .await?;
                info!(session_id = %session.id, "abandoned session ended");
                outcome.ended.push(session.id);
            }
        }

        // Bot-only sessions that went quiet without ever reaching a human.
        for session in sessions::list_stale_unattended(&self.db, abandon_cutoff).await? {
            let ended = sessions::update_status_from(
                &self.db,
                &session.id,
                SessionStatus::Active,
                SessionStatus::Ended,
            )
            .await?;
            if ended {
                queue::cancel_waiting(&self.db, &session.id, "session abandoned").await?;
                info!(session_id = %session.id, "unattended session ended");
                outcome.ended.push(session.id);
            }
        }

        Ok(outcome)
    }

    /// Bring a parked session back when the user speaks. Returns the status
    /// the session moved to, or `None` when it was not parked.
    pub async fn reactivate(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionStatus>, HandoffError> {
        let Some(session) = sessions::get_session(&self.db, session_id).await? else {
            return Ok(None);
        };
        if session.status != SessionStatus::WaitingClient {
            return Ok(None);
        }

        // Back to the operator if the link survived, else to the bot.
        let target = if sessions::operator_for_session(&self.db, session_id)
            .await?
            .is_some()
        {
            SessionStatus::WithOperator
        } else {
            SessionStatus::Active
        };

        let moved = sessions::update_status_from(
            &self.db,
            session_id,
            SessionStatus::WaitingClient,
            target,
        )
        .await?;
        if !moved {
            debug!(session_id, "reactivation lost a race, leaving status alone");
            return Ok(None);
        }

        messages::insert_message(
            &self.db,
            &SessionMessage::system(session_id, "Welcome back, resuming your conversation."),
        )
        .await?;
        info!(session_id, status = %target, "parked session reactivated");
        Ok(Some(target))
    }

    /// Whether a user message arrived after `cutoff`. `last_activity` should
    /// already reflect this, but the message log is authoritative.
    async fn user_spoke_since(
        &self,
        session: &ChatSession,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<bool, HandoffError> {
        let last = messages::last_message_at(&self.db, &session.id, MessageSender::User).await?;
        Ok(matches!(last, Some(at) if at >= cutoff))
    }
}
