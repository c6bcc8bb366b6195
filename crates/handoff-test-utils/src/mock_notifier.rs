// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording mock for the [`Notifier`] trait.

use async_trait::async_trait;
use handoff_core::HandoffError;
use handoff_core::traits::{Notifier, QueueEvent};
use tokio::sync::Mutex;

/// Records every notification instead of delivering it. Can be put into a
/// failing mode to exercise best-effort delivery paths.
#[derive(Default)]
pub struct MockNotifier {
    operator_events: Mutex<Vec<(String, QueueEvent)>>,
    session_events: Mutex<Vec<(String, QueueEvent)>>,
    broadcasts: Mutex<Vec<QueueEvent>>,
    fail: Mutex<bool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail.
    pub async fn set_failing(&self, fail: bool) {
        *self.fail.lock().await = fail;
    }

    pub async fn operator_events(&self) -> Vec<(String, QueueEvent)> {
        self.operator_events.lock().await.clone()
    }

    pub async fn session_events(&self) -> Vec<(String, QueueEvent)> {
        self.session_events.lock().await.clone()
    }

    pub async fn broadcasts(&self) -> Vec<QueueEvent> {
        self.broadcasts.lock().await.clone()
    }

    async fn check_fail(&self) -> Result<(), HandoffError> {
        if *self.fail.lock().await {
            return Err(HandoffError::Notify {
                message: "mock notifier set to fail".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_operator(
        &self,
        operator_id: &str,
        event: QueueEvent,
    ) -> Result<(), HandoffError> {
        self.check_fail().await?;
        self.operator_events
            .lock()
            .await
            .push((operator_id.to_string(), event));
        Ok(())
    }

    async fn notify_session(
        &self,
        session_id: &str,
        event: QueueEvent,
    ) -> Result<(), HandoffError> {
        self.check_fail().await?;
        self.session_events
            .lock()
            .await
            .push((session_id.to_string(), event));
        Ok(())
    }

    async fn broadcast(&self, event: QueueEvent) -> Result<(), HandoffError> {
        self.check_fail().await?;
        self.broadcasts.lock().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::types::Priority;

    #[tokio::test]
    async fn records_deliveries() {
        let notifier = MockNotifier::new();
        notifier
            .broadcast(QueueEvent::SessionQueued {
                session_id: "s1".to_string(),
                priority: Priority::High,
                position: 1,
            })
            .await
            .unwrap();
        assert_eq!(notifier.broadcasts().await.len(), 1);
    }

    #[tokio::test]
    async fn failing_mode_errors() {
        let notifier = MockNotifier::new();
        notifier.set_failing(true).await;
        let result = notifier
            .notify_operator(
                "op-1",
                QueueEvent::SessionAssigned {
                    session_id: "s1".to_string(),
                    operator_id: "op-1".to_string(),
                },
            )
            .await;
        assert!(result.is_err());
        assert!(notifier.operator_events().await.is_empty());
    }
}
