// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only queue and SLA reporting, backing the `status` command.

use std::sync::Arc;

use chrono::{Duration, Utc};
use handoff_core::HandoffError;
use handoff_core::types::Priority;
use handoff_storage::Database;
use handoff_storage::queries::sla::PriorityMetrics;
use handoff_storage::queries::{queue, sla};

/// Point-in-time queue snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStats {
    pub waiting: usize,
    pub assigned: usize,
    pub waiting_by_priority: Vec<(Priority, usize)>,
    /// Mean minutes from enqueue to assignment, over all assignments so far.
    pub average_wait_minutes: Option<f64>,
}

/// SLA performance over a trailing window.
#[derive(Debug, Clone)]
pub struct SlaMetrics {
    pub window_days: i64,
    pub open: usize,
    pub violated: usize,
    pub completed: usize,
    pub by_priority: Vec<PriorityMetrics>,
}

pub struct Reporter {
    db: Arc<Database>,
}

impl Reporter {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn queue_stats(&self) -> Result<QueueStats, HandoffError> {
        let counts = queue::queue_counts(&self.db).await?;
        let average_wait_minutes = queue::average_wait_minutes(&self.db).await?;
        Ok(QueueStats {
            waiting: counts.waiting,
            assigned: counts.assigned,
            waiting_by_priority: counts.waiting_by_priority,
            average_wait_minutes,
        })
    }

    pub async fn sla_metrics(&self, window_days: i64) -> Result<SlaMetrics, HandoffError> {
        let summary = sla::summary(&self.db).await?;
        let since = Utc::now() - Duration::days(window_days);
        let by_priority = sla::priority_metrics(&self.db, since).await?;
        Ok(SlaMetrics {
            window_days,
            open: summary.active + summary.warning,
            violated: summary.violated,
            completed: summary.completed,
            by_priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use handoff_core::types::{ChatSession, QueueEntry, SessionStatus};
    use handoff_storage::queries::sessions;
    use tempfile::tempdir;

    async fn setup() -> (Arc<Database>, Reporter, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());
        let reporter = Reporter::new(db.clone());
        (db, reporter, dir)
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

    #[tokio::test]
    async fn queue_stats_reflect_membership() {
        let (db, reporter, _dir) = setup().await;
        seed_session(&db, "s1").await;
        seed_session(&db, "s2").await;
        queue::insert_entry(&db, &QueueEntry::new("s1", Priority::High, vec![], 5))
            .await
            .unwrap();
        queue::insert_entry(&db, &QueueEntry::new("s2", Priority::High, vec![], 5))
            .await
            .unwrap();
        queue::claim_next(&db, "op-1", &[]).await.unwrap().unwrap();

        let stats = reporter.queue_stats().await.unwrap();
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.assigned, 1);
        assert_eq!(stats.waiting_by_priority, vec![(Priority::High, 1)]);
        assert!(stats.average_wait_minutes.is_some());
    }

    #[tokio::test]
    async fn empty_database_reports_zeroes() {
        let (_db, reporter, _dir) = setup().await;
        let stats = reporter.queue_stats().await.unwrap();
        assert_eq!(stats.waiting, 0);
        assert!(stats.average_wait_minutes.is_none());

        let metrics = reporter.sla_metrics(7).await.unwrap();
        assert_eq!(metrics.open, 0);
        assert!(metrics.by_priority.is_empty());
    }
}
