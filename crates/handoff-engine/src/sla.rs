// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SLA deadline tracking.
//!
//! Each tracked entity holds at most one open record; deadlines come from
//! the per-priority windows in `[sla]` config. Breach detection happens in
//! [`SlaTracker::sweep`], whose storage layer flips records exactly once,
//! so callers can escalate everything it returns without deduplicating.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use handoff_config::model::SlaConfig;
use handoff_core::HandoffError;
use handoff_core::types::{Priority, SlaEntityType, SlaRecord, SlaStatus};
use handoff_storage::Database;
use handoff_storage::queries::sla;
use tracing::{debug, info};
use uuid::Uuid;

/// The deadlines a record would get if created now.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub response: DateTime<Utc>,
    pub resolution: DateTime<Utc>,
    pub warning: DateTime<Utc>,
}

/// Outcome of stamping a first response.
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    pub on_time: bool,
    pub record: SlaRecord,
}

/// Records flipped by one sweep pass. Every element is freshly flipped;
/// repeat sweeps never re-deliver a record.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub warned: Vec<SlaRecord>,
    pub violated: Vec<SlaRecord>,
}

pub struct SlaTracker {
    db: Arc<Database>,
    config: SlaConfig,
}

impl SlaTracker {
    pub fn new(db: Arc<Database>, config: SlaConfig) -> Self {
        Self { db, config }
    }

    /// Deadlines for `priority` measured from `from`. The warning threshold
    /// sits at `warning_fraction` of the response window.
    pub fn deadlines_from(&self, priority: Priority, from: DateTime<Utc>) -> Deadlines {
        let response_window = self.config.response_minutes.for_priority(priority);
        let resolution_window = self.config.resolution_minutes.for_priority(priority);
        let warning_secs = (response_window as f64 * 60.0 * self.config.warning_fraction) as i64;
        Deadlines {
            response: from + Duration::minutes(response_window),
            resolution: from + Duration::minutes(resolution_window),
            warning: from + Duration::seconds(warning_secs),
        }
    }

    /// Open a record for an entity. Idempotent: an existing open record is
    /// returned untouched, preserving its original deadlines.
    pub async fn create(
        &self,
        entity_id: &str,
        entity_type: SlaEntityType,
        priority: Priority,
        category: &str,
    ) -> Result<SlaRecord, HandoffError> {
        if let Some(existing) = sla::open_record(&self.db, entity_id, entity_type).await? {
            debug!(entity_id, %entity_type, "entity already has an open record");
            return Ok(existing);
        }

        let now = Utc::now();
        let deadlines = self.deadlines_from(priority, now);
        let record = SlaRecord {
            id: Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            entity_type,
            priority,
            category: category.to_string(),
            status: SlaStatus::Active,
            created_at: now,
            response_deadline: deadlines.response,
            resolution_deadline: deadlines.resolution,
            warning_threshold: deadlines.warning,
            first_response_at: None,
            response_on_time: None,
            resolved_at: None,
            resolution_on_time: None,
            total_resolution_minutes: None,
            violated_at: None,
        };
        sla::insert_record(&self.db, &record).await?;
        info!(
            entity_id,
            %entity_type,
            %priority,
            response_deadline = %record.response_deadline,
            "sla record opened"
        );
        Ok(record)
    }

    /// Stamp the first response on an entity's open record. Returns `None`
    /// when there is no open record or it was already stamped; the caller
    /// escalates late responses.
    pub async fn record_response(
        &self,
        entity_id: &str,
        entity_type: SlaEntityType,
    ) -> Result<Option<ResponseOutcome>, HandoffError> {
        let now = Utc::now();
        if !sla::record_first_response(&self.db, entity_id, entity_type, now).await? {
            return Ok(None);
        }
        let record = sla::open_record(&self.db, entity_id, entity_type)
            .await?
            .ok_or(HandoffError::NotFound {
                entity: "sla_record",
                id: entity_id.to_string(),
            })?;
        let on_time = record.response_on_time.unwrap_or(false);
        info!(entity_id, %entity_type, on_time, "first response recorded");
        Ok(Some(ResponseOutcome { on_time, record }))
    }

    /// Close an entity's open record as completed. Returns `false` when no
    /// open record existed.
    pub async fn resolve(
        &self,
        entity_id: &str,
        entity_type: SlaEntityType,
    ) -> Result<bool, HandoffError> {
        let closed = sla::complete_record(&self.db, entity_id, entity_type, Utc::now()).await?;
        if closed {
            info!(entity_id, %entity_type, "sla record completed");
        }
        Ok(closed)
    }

    /// Tighten an open record to a higher priority. New deadlines are
    /// measured from now, not from the record's creation.
    pub async fn upgrade(
        &self,
        entity_id: &str,
        entity_type: SlaEntityType,
        priority: Priority,
    ) -> Result<bool, HandoffError> {
        let deadlines = self.deadlines_from(priority, Utc::now());
        let changed = sla::upgrade_open_record(
            &self.db,
            entity_id,
            entity_type,
            priority,
            deadlines.response,
            deadlines.resolution,
            deadlines.warning,
        )
        .await?;
        if changed {
            info!(entity_id, %entity_type, %priority, "sla record upgraded");
        }
        Ok(changed)
    }

    /// One breach-detection pass.
    pub async fn sweep(&self) -> Result<SweepOutcome, HandoffError> {
        let now = Utc::now();
        let warned = sla::sweep_warnings(&self.db, now).await?;
        let violated = sla::sweep_violations(&self.db, now).await?;
        if !warned.is_empty() || !violated.is_empty() {
            info!(
                warned = warned.len(),
                violated = violated.len(),
                "sla sweep flipped records"
            );
        }
        Ok(SweepOutcome { warned, violated })
    }
}
