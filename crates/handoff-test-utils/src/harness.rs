// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine testing.
//!
//! `TestHarness` assembles a complete engine with mock collaborators and a
//! temp SQLite database, plus helpers for seeding sessions and operators.

use std::sync::Arc;

use chrono::{Duration, Utc};
use handoff_config::model::HandoffConfig;
use handoff_core::HandoffError;
use handoff_core::types::{ChatSession, Operator, OperatorRole, SessionStatus};
use handoff_engine::HandoffEngine;
use handoff_storage::Database;
use handoff_storage::queries::{operators, sessions};

use crate::mock_notifier::MockNotifier;
use crate::mock_ticketing::MockTicketing;

/// Builder for configuring the test environment.
pub struct TestHarnessBuilder {
    config: HandoffConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: HandoffConfig::default(),
        }
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: HandoffConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the harness, creating the temp database and engine.
    pub async fn build(self) -> Result<TestHarness, HandoffError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| HandoffError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::open(&db_path.to_string_lossy()).await?);

        let notifier = Arc::new(MockNotifier::new());
        let ticketing = Arc::new(MockTicketing::new());
        let engine = Arc::new(HandoffEngine::new(
            db.clone(),
            &self.config,
            notifier.clone(),
            ticketing.clone(),
        ));

        Ok(TestHarness {
            engine,
            db,
            notifier,
            ticketing,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete engine with mock collaborators and temp storage.
pub struct TestHarness {
    pub engine: Arc<HandoffEngine>,
    pub db: Arc<Database>,
    pub notifier: Arc<MockNotifier>,
    pub ticketing: Arc<MockTicketing>,
    pub config: HandoffConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Seed an active session, optionally backdating its last activity.
    pub async fn seed_session(
        &self,
        id: &str,
        status: SessionStatus,
        idle_minutes: i64,
    ) -> Result<(), HandoffError> {
        let at = Utc::now() - Duration::minutes(idle_minutes);
        sessions::create_session(
            &self.db,
            &ChatSession {
                id: id.to_string(),
                channel: "web".to_string(),
                user_id: Some("test-user".to_string()),
                status,
                last_activity: at,
                created_at: at,
                updated_at: at,
            },
        )
        .await
    }

    /// Seed an online agent with the given skills.
    pub async fn seed_operator(&self, id: &str, skills: Vec<String>) -> Result<(), HandoffError> {
        self.seed_operator_with_role(id, skills, OperatorRole::Agent, true)
            .await
    }

    pub async fn seed_operator_with_role(
        &self,
        id: &str,
        skills: Vec<String>,
        role: OperatorRole,
        online: bool,
    ) -> Result<(), HandoffError> {
        operators::upsert_operator(
            &self.db,
            &Operator {
                id: id.to_string(),
                name: id.to_string(),
                role,
                skills,
                online,
                active: true,
                max_sessions: 3,
                created_at: Utc::now(),
            },
        )
        .await
    }

    /// Current status of a seeded session.
    pub async fn session_status(&self, id: &str) -> Result<SessionStatus, HandoffError> {
        let session = sessions::get_session(&self.db, id)
            .await?
            .ok_or(HandoffError::NotFound {
                entity: "session",
                id: id.to_string(),
            })?;
        Ok(session.status)
    }
}
