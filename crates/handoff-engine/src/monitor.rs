// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background sweep loops.
//!
//! Three fixed-interval loops: SLA breach detection, inactivity handling,
//! and stale queue-entry cleanup. A failed tick is logged and the loop
//! keeps running; only cancellation stops it.

use std::sync::Arc;
use std::time::Duration;

use handoff_config::model::HandoffConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::HandoffEngine;

/// Handles to the running sweep loops.
pub struct MonitorSet {
    token: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl MonitorSet {
    /// Spawn all sweep loops. The returned set owns the cancellation token;
    /// dropping it without calling [`shutdown`](Self::shutdown) leaves the
    /// loops running detached.
    pub fn spawn(engine: Arc<HandoffEngine>, config: &HandoffConfig) -> Self {
        let token = CancellationToken::new();
        let handles = vec![
            (
                "sla-sweep",
                spawn_loop(
                    "sla-sweep",
                    Duration::from_secs(config.sla.sweep_interval_secs),
                    token.clone(),
                    engine.clone(),
                    |engine| async move {
                        engine.run_sla_sweep().await.map(|escalated| {
                            if escalated > 0 {
                                info!(escalated, "sla sweep escalated violations");
                            }
                        })
                    },
                ),
            ),
            (
                "inactivity-sweep",
                spawn_loop(
                    "inactivity-sweep",
                    Duration::from_secs(config.inactivity.sweep_interval_secs),
                    token.clone(),
                    engine.clone(),
                    |engine| async move {
                        engine.run_inactivity_sweep().await.map(|sweep| {
                            if !sweep.parked.is_empty() || !sweep.ended.is_empty() {
                                info!(
                                    parked = sweep.parked.len(),
                                    ended = sweep.ended.len(),
                                    "inactivity sweep moved sessions"
                                );
                            }
                        })
                    },
                ),
            ),
            (
                "queue-cleanup",
                spawn_loop(
                    "queue-cleanup",
                    Duration::from_secs(config.queue.cleanup_interval_secs),
                    token.clone(),
                    engine,
                    |engine| async move {
                        engine.run_cleanup_sweep().await.map(|repaired| {
                            if repaired > 0 {
                                info!(repaired, "queue cleanup repaired stale entries");
                            }
                        })
                    },
                ),
            ),
        ];
        Self { token, handles }
    }

    /// Cancel all loops and wait for them to drain.
    pub async fn shutdown(self) {
        self.token.cancel();
        for (name, handle) in self.handles {
            if let Err(error) = handle.await {
                warn!(loop_name = name, %error, "sweep loop did not shut down cleanly");
            } else {
                debug!(loop_name = name, "sweep loop stopped");
            }
        }
        info!("background monitors stopped");
    }
}

fn spawn_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    engine: Arc<HandoffEngine>,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<HandoffEngine>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<(), handoff_core::HandoffError>> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quiet.
        interval.tick().await;
        info!(loop_name = name, period_secs = period.as_secs(), "sweep loop started");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(error) = tick(engine.clone()).await {
                        warn!(loop_name = name, %error, "sweep tick failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_test_utils::{MockNotifier, MockTicketing};
    use tempfile::tempdir;

    #[tokio::test]
    async fn monitors_start_and_shut_down() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Arc::new(
            handoff_storage::Database::open(db_path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let config = HandoffConfig::default();
        let engine = Arc::new(HandoffEngine::new(
            db,
            &config,
            Arc::new(MockNotifier::new()),
            Arc::new(MockTicketing::new()),
        ));

        let monitors = MonitorSet::spawn(engine, &config);
        tokio::time::sleep(Duration::from_millis(50)).await;
        monitors.shutdown().await;
    }
}
