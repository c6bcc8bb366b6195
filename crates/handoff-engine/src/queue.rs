// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Priority queue of sessions waiting for a human operator.
//!
//! The store is the source of truth for ordering and membership; the
//! position cache only remembers the last position pushed to each session
//! so unchanged positions are not re-notified. Losing the cache costs one
//! redundant notification per session, nothing more.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use handoff_config::model::QueueConfig;
use handoff_core::HandoffError;
use handoff_core::traits::{Notifier, QueueEvent};
use handoff_core::types::{Operator, Priority, QueueEntry};
use handoff_storage::Database;
use handoff_storage::queries::{operators, queue};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Where a session landed after an enqueue request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePlacement {
    pub queue_id: String,
    /// 1-based rank among waiting entries; `None` once the entry is
    /// assigned and no longer holds a rank.
    pub position: Option<usize>,
    pub estimated_wait_minutes: i64,
    /// True when the session already held a live entry and no row was added.
    pub already_in_queue: bool,
}

/// Manages queue membership, ordering, claims, and position notifications.
pub struct QueueManager {
    db: Arc<Database>,
    config: QueueConfig,
    notifier: Arc<dyn Notifier>,
    /// Last position pushed to each waiting session.
    position_cache: Mutex<HashMap<String, usize>>,
}

impl QueueManager {
    pub fn new(db: Arc<Database>, config: QueueConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            config,
            notifier,
            position_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Add a session to the queue, or report its existing placement.
    ///
    /// Idempotent: a session with a live entry keeps it (original priority
    /// and position) and gets `already_in_queue = true` back.
    pub async fn add_to_queue(
        &self,
        session_id: &str,
        priority: Priority,
        required_skills: Vec<String>,
    ) -> Result<QueuePlacement, HandoffError> {
        if let Some(existing) = queue::live_entry_for_session(&self.db, session_id).await? {
            // Waiting entries report their rank; assigned ones have none.
            let position = queue::waiting_position(&self.db, session_id).await?;
            debug!(session_id, queue_id = %existing.id, "session already queued");
            return Ok(QueuePlacement {
                queue_id: existing.id,
                position,
                estimated_wait_minutes: existing.estimated_wait_minutes,
                already_in_queue: true,
            });
        }

        let waiting = queue::queue_counts(&self.db).await?.waiting;
        let estimate = self.estimate_wait(waiting + 1).await?;
        let entry = QueueEntry::new(session_id, priority, required_skills, estimate);
        queue::insert_entry(&self.db, &entry).await?;

        let position = queue::waiting_position(&self.db, session_id)
            .await?
            .unwrap_or(1);
        self.position_cache
            .lock()
            .await
            .insert(session_id.to_string(), position);

        info!(
            session_id,
            queue_id = %entry.id,
            %priority,
            position,
            estimated_wait_minutes = estimate,
            "session queued"
        );
        self.notify_best_effort(
            self.notifier.broadcast(QueueEvent::SessionQueued {
                session_id: session_id.to_string(),
                priority,
                position,
            })
            .await,
        );

        // A higher-priority arrival displaces everyone behind it.
        self.refresh_positions().await?;

        Ok(QueuePlacement {
            queue_id: entry.id,
            position: Some(position),
            estimated_wait_minutes: estimate,
            already_in_queue: false,
        })
    }

    /// Claim the next entry this operator can serve. The claim happens in a
    /// single storage transaction, so concurrent claimers get distinct
    /// entries or nothing.
    pub async fn assign_next(&self, operator: &Operator) -> Result<Option<QueueEntry>, HandoffError> {
        let Some(entry) = queue::claim_next(&self.db, &operator.id, &operator.skills).await? else {
            return Ok(None);
        };

        self.position_cache.lock().await.remove(&entry.session_id);
        info!(
            session_id = %entry.session_id,
            operator_id = %operator.id,
            queue_id = %entry.id,
            "queue entry assigned"
        );
        self.notify_best_effort(
            self.notifier
                .notify_operator(
                    &operator.id,
                    QueueEvent::SessionAssigned {
                        session_id: entry.session_id.clone(),
                        operator_id: operator.id.clone(),
                    },
                )
                .await,
        );
        self.notify_best_effort(
            self.notifier
                .notify_session(
                    &entry.session_id,
                    QueueEvent::SessionAssigned {
                        session_id: entry.session_id.clone(),
                        operator_id: operator.id.clone(),
                    },
                )
                .await,
        );

        self.refresh_positions().await?;
        Ok(Some(entry))
    }

    /// Cancel a session's waiting entry. Returns `false` when there was
    /// nothing to cancel (already assigned, or not queued at all).
    pub async fn remove_from_queue(
        &self,
        session_id: &str,
        reason: &str,
    ) -> Result<bool, HandoffError> {
        let removed = queue::cancel_waiting(&self.db, session_id, reason).await?;
        if removed {
            self.position_cache.lock().await.remove(session_id);
            info!(session_id, reason, "session removed from queue");
            self.refresh_positions().await?;
        }
        Ok(removed)
    }

    /// Current 1-based position of a waiting session.
    pub async fn position(&self, session_id: &str) -> Result<Option<usize>, HandoffError> {
        queue::waiting_position(&self.db, session_id).await
    }

    /// Recompute all waiting positions and notify sessions whose position
    /// changed since the last push.
    pub async fn refresh_positions(&self) -> Result<(), HandoffError> {
        let waiting = queue::list_waiting(&self.db).await?;
        let estimate = self.estimate_wait(waiting.len()).await?;
        let mut cache = self.position_cache.lock().await;

        let mut fresh = HashMap::with_capacity(waiting.len());
        for (idx, entry) in waiting.iter().enumerate() {
            let position = idx + 1;
            fresh.insert(entry.session_id.clone(), position);
            if cache.get(&entry.session_id) == Some(&position) {
                continue;
            }
            self.notify_best_effort(
                self.notifier
                    .notify_session(
                        &entry.session_id,
                        QueueEvent::PositionChanged {
                            session_id: entry.session_id.clone(),
                            position,
                            estimated_wait_minutes: estimate,
                        },
                    )
                    .await,
            );
        }
        *cache = fresh;
        Ok(())
    }

    /// Repair the queue: cancel waiting entries whose session has already
    /// closed, and time out entries waiting past the configured limit.
    /// Returns the number of entries touched.
    pub async fn cleanup_stale_entries(&self) -> Result<usize, HandoffError> {
        let cutoff = Utc::now() - Duration::minutes(self.config.entry_timeout_minutes);
        let timed_out = queue::timeout_overdue(&self.db, cutoff).await?;
        for entry in &timed_out {
            warn!(
                session_id = %entry.session_id,
                queue_id = %entry.id,
                waited_minutes = (Utc::now() - entry.entered_at).num_minutes(),
                "queue entry timed out"
            );
        }

        let repaired = queue::cancel_orphaned(&self.db).await?;
        if !repaired.is_empty() {
            warn!(count = repaired.len(), "cancelled orphaned queue entries");
        }

        let touched = timed_out.len() + repaired.len();
        if touched > 0 {
            let mut cache = self.position_cache.lock().await;
            for entry in timed_out.iter().chain(repaired.iter()) {
                cache.remove(&entry.session_id);
            }
            drop(cache);
            self.refresh_positions().await?;
        }
        Ok(touched)
    }

    /// Capacity-heuristic wait estimate for a queue of `waiting` entries:
    /// no operators online reports the maximum, a truly idle operator the
    /// minimum, otherwise `ceil(waiting / busy * avg_handle)` clamped.
    pub async fn estimate_wait(&self, waiting: usize) -> Result<i64, HandoffError> {
        let pool = operators::pool_snapshot(&self.db).await?;
        if pool.online == 0 {
            return Ok(self.config.max_wait_minutes);
        }
        if pool.idle > 0 {
            return Ok(self.config.idle_wait_minutes);
        }
        let busy = pool.busy.max(1) as i64;
        let waiting = waiting as i64;
        let raw = (waiting * self.config.avg_handle_minutes + busy - 1) / busy;
        Ok(raw.clamp(self.config.min_wait_minutes, self.config.max_wait_minutes))
    }

    fn notify_best_effort(&self, result: Result<(), HandoffError>) {
        if let Err(error) = result {
            warn!(%error, "queue notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use handoff_core::types::{ChatSession, OperatorRole, SessionStatus};
    use handoff_storage::queries::sessions;
    use handoff_test_utils::MockNotifier;
    use tempfile::tempdir;

    async fn setup() -> (Arc<Database>, Arc<MockNotifier>, QueueManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());
        let notifier = Arc::new(MockNotifier::new());
        let manager = QueueManager::new(db.clone(), QueueConfig::default(), notifier.clone());
        (db, notifier, manager, dir)
    }

    async fn seed_session(db: &Database, id: &str) {
        let now = Utc::now();
        sessions::create_session(
            db,
            &ChatSession {
                id: id.to_string(),
                channel: "web".to_string(),
                user_id: None,
                status: SessionStatus::WaitingOperator,
                last_activity: now,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    fn operator(id: &str, skills: Vec<String>) -> Operator {
        Operator {
            id: id.to_string(),
            name: id.to_string(),
            role: OperatorRole::Agent,
            skills,
            online: true,
            active: true,
            max_sessions: 3,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let (db, _notifier, manager, _dir) = setup().await;
        seed_session(&db, "s1").await;

        let first = manager
            .add_to_queue("s1", Priority::Medium, vec![])
            .await
            .unwrap();
        assert!(!first.already_in_queue);

        let second = manager
            .add_to_queue("s1", Priority::Urgent, vec![])
            .await
            .unwrap();
        assert!(second.already_in_queue);
        assert_eq!(second.queue_id, first.queue_id, "original entry kept");
        assert_eq!(second.position, Some(1));
    }

    #[tokio::test]
    async fn re_add_after_assignment_reports_no_rank() {
        let (db, _notifier, manager, _dir) = setup().await;
        seed_session(&db, "s1").await;
        manager
            .add_to_queue("s1", Priority::Medium, vec![])
            .await
            .unwrap();
        let op = operator("op-1", vec![]);
        manager.assign_next(&op).await.unwrap().unwrap();

        let placement = manager
            .add_to_queue("s1", Priority::Medium, vec![])
            .await
            .unwrap();
        assert!(placement.already_in_queue);
        assert_eq!(placement.position, None, "assigned entries hold no rank");
    }

    #[tokio::test]
    async fn later_high_priority_overtakes_earlier_low() {
        let (db, notifier, manager, _dir) = setup().await;
        seed_session(&db, "s1").await;
        seed_session(&db, "s2").await;

        let low = manager
            .add_to_queue("s1", Priority::Low, vec![])
            .await
            .unwrap();
        assert_eq!(low.position, Some(1));

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let high = manager
            .add_to_queue("s2", Priority::High, vec![])
            .await
            .unwrap();
        assert_eq!(high.position, Some(1));
        assert_eq!(manager.position("s1").await.unwrap(), Some(2));

        // The displaced session was told about its new position.
        let pushed = notifier.session_events().await;
        assert!(pushed.iter().any(|(session, event)| {
            session == "s1"
                && matches!(event, QueueEvent::PositionChanged { position: 2, .. })
        }));

        // Claims drain high first, then FIFO.
        let op = operator("op-1", vec![]);
        let first = manager.assign_next(&op).await.unwrap().unwrap();
        assert_eq!(first.session_id, "s2");
        let second = manager.assign_next(&op).await.unwrap().unwrap();
        assert_eq!(second.session_id, "s1");
        assert!(manager.assign_next(&op).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_only_waiting_entries() {
        let (db, _notifier, manager, _dir) = setup().await;
        seed_session(&db, "s1").await;
        manager
            .add_to_queue("s1", Priority::Medium, vec![])
            .await
            .unwrap();

        let op = operator("op-1", vec![]);
        manager.assign_next(&op).await.unwrap().unwrap();

        // Assigned entries are out of reach for removal.
        assert!(!manager.remove_from_queue("s1", "user left").await.unwrap());
    }

    #[tokio::test]
    async fn assignment_notifies_both_sides() {
        let (db, notifier, manager, _dir) = setup().await;
        seed_session(&db, "s1").await;
        manager
            .add_to_queue("s1", Priority::High, vec![])
            .await
            .unwrap();

        let op = operator("op-1", vec![]);
        manager.assign_next(&op).await.unwrap().unwrap();

        let operator_events = notifier.operator_events().await;
        assert!(operator_events.iter().any(|(id, event)| {
            id == "op-1" && matches!(event, QueueEvent::SessionAssigned { .. })
        }));
        let session_events = notifier.session_events().await;
        assert!(session_events.iter().any(|(id, event)| {
            id == "s1" && matches!(event, QueueEvent::SessionAssigned { .. })
        }));
    }

    #[tokio::test]
    async fn wait_estimate_tiers() {
        let (db, _notifier, manager, _dir) = setup().await;
        let cfg = QueueConfig::default();

        // Nobody online: worst case.
        assert_eq!(manager.estimate_wait(4).await.unwrap(), cfg.max_wait_minutes);

        // An idle operator: near-immediate.
        handoff_storage::queries::operators::upsert_operator(&db, &operator("idle", vec![]))
            .await
            .unwrap();
        assert_eq!(manager.estimate_wait(4).await.unwrap(), cfg.idle_wait_minutes);

        // All operators busy: capacity heuristic, clamped.
        seed_session(&db, "busy-session").await;
        sessions::link_operator(&db, "busy-session", "idle")
            .await
            .unwrap();
        let estimate = manager.estimate_wait(2).await.unwrap();
        assert_eq!(estimate, (2 * cfg.avg_handle_minutes).min(cfg.max_wait_minutes));
        assert!(manager.estimate_wait(100).await.unwrap() <= cfg.max_wait_minutes);
        assert!(manager.estimate_wait(0).await.unwrap() >= cfg.min_wait_minutes);

        // Uneven split across two busy operators rounds up.
        handoff_storage::queries::operators::upsert_operator(&db, &operator("second", vec![]))
            .await
            .unwrap();
        seed_session(&db, "busy-2").await;
        sessions::link_operator(&db, "busy-2", "second")
            .await
            .unwrap();
        let estimate = manager.estimate_wait(3).await.unwrap();
        assert_eq!(estimate, (3 * cfg.avg_handle_minutes + 1) / 2);
    }

    #[tokio::test]
    async fn cleanup_times_out_overstayed_entries() {
        let (db, _notifier, manager, _dir) = setup().await;
        seed_session(&db, "s1").await;

        let mut entry =
            handoff_core::types::QueueEntry::new("s1", Priority::Low, vec![], 30);
        entry.entered_at =
            Utc::now() - Duration::minutes(QueueConfig::default().entry_timeout_minutes + 5);
        handoff_storage::queries::queue::insert_entry(&db, &entry)
            .await
            .unwrap();

        assert_eq!(manager.cleanup_stale_entries().await.unwrap(), 1);
        assert!(manager.position("s1").await.unwrap().is_none());
        assert_eq!(manager.cleanup_stale_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cleanup_cancels_entries_for_closed_sessions() {
        let (db, _notifier, manager, _dir) = setup().await;
        seed_session(&db, "s1").await;
        manager
            .add_to_queue("s1", Priority::Medium, vec![])
            .await
            .unwrap();
        sessions::update_status(&db, "s1", SessionStatus::Ended)
            .await
            .unwrap();

        assert_eq!(manager.cleanup_stale_entries().await.unwrap(), 1);
        assert_eq!(manager.cleanup_stale_entries().await.unwrap(), 0);
        assert!(manager.position("s1").await.unwrap().is_none());
    }
}
