// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Handoff engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use handoff_core::types::Priority;
use serde::{Deserialize, Serialize};

/// Top-level Handoff configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffConfig {
    /// Engine-wide settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Queue behavior and wait-estimate settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// SLA deadline windows and sweep settings.
    #[serde(default)]
    pub sla: SlaConfig,

    /// Inactivity timeout settings.
    #[serde(default)]
    pub inactivity: InactivityConfig,
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("handoff").join("handoff.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("handoff.db"))
        .to_string_lossy()
        .into_owned()
}

/// Queue behavior and wait-estimate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Average minutes an operator spends handling one session. Feeds the
    /// capacity heuristic `ceil(waiting / busy * avg_handle_minutes)`.
    #[serde(default = "default_avg_handle_minutes")]
    pub avg_handle_minutes: i64,

    /// Lower clamp on the computed wait estimate.
    #[serde(default = "default_min_wait_minutes")]
    pub min_wait_minutes: i64,

    /// Upper clamp on the wait estimate; also the ceiling reported when no
    /// operators are online.
    #[serde(default = "default_max_wait_minutes")]
    pub max_wait_minutes: i64,

    /// Estimate reported when at least one operator is truly idle.
    #[serde(default = "default_idle_wait_minutes")]
    pub idle_wait_minutes: i64,

    /// Minutes a waiting entry may sit unclaimed before the cleanup sweep
    /// marks it timed out.
    #[serde(default = "default_entry_timeout_minutes")]
    pub entry_timeout_minutes: i64,

    /// Interval between stale-entry cleanup sweeps, in seconds.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            avg_handle_minutes: default_avg_handle_minutes(),
            min_wait_minutes: default_min_wait_minutes(),
            max_wait_minutes: default_max_wait_minutes(),
            idle_wait_minutes: default_idle_wait_minutes(),
            entry_timeout_minutes: default_entry_timeout_minutes(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_avg_handle_minutes() -> i64 {
    5
}

fn default_min_wait_minutes() -> i64 {
    3
}

fn default_max_wait_minutes() -> i64 {
    30
}

fn default_idle_wait_minutes() -> i64 {
    1
}

fn default_entry_timeout_minutes() -> i64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    3600 // hourly
}

/// Minutes per priority, used for both response and resolution windows.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PriorityMinutes {
    pub urgent: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

impl PriorityMinutes {
    /// The window for a given priority.
    pub fn for_priority(&self, priority: Priority) -> i64 {
        match priority {
            Priority::Urgent => self.urgent,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// SLA deadline windows and sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlaConfig {
    /// First-response windows in minutes, per priority.
    #[serde(default = "default_response_minutes")]
    pub response_minutes: PriorityMinutes,

    /// Resolution windows in minutes, per priority.
    #[serde(default = "default_resolution_minutes")]
    pub resolution_minutes: PriorityMinutes,

    /// Fraction of the response window after which a warning fires (0..1).
    #[serde(default = "default_warning_fraction")]
    pub warning_fraction: f64,

    /// Interval between SLA breach sweeps, in seconds.
    #[serde(default = "default_sla_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            response_minutes: default_response_minutes(),
            resolution_minutes: default_resolution_minutes(),
            warning_fraction: default_warning_fraction(),
            sweep_interval_secs: default_sla_sweep_interval_secs(),
        }
    }
}

fn default_response_minutes() -> PriorityMinutes {
    PriorityMinutes {
        urgent: 2,
        high: 5,
        medium: 15,
        low: 30,
    }
}

fn default_resolution_minutes() -> PriorityMinutes {
    PriorityMinutes {
        urgent: 60,
        high: 120,
        medium: 480,
        low: 1440,
    }
}

fn default_warning_fraction() -> f64 {
    0.8
}

fn default_sla_sweep_interval_secs() -> u64 {
    60
}

/// Inactivity timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InactivityConfig {
    /// Minutes without a user message before an attended session is moved
    /// to waiting_client.
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: i64,

    /// Minutes without any activity before an unattended session is ended.
    #[serde(default = "default_abandon_minutes")]
    pub abandon_minutes: i64,

    /// Interval between inactivity sweeps, in seconds.
    #[serde(default = "default_inactivity_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
            abandon_minutes: default_abandon_minutes(),
            sweep_interval_secs: default_inactivity_sweep_interval_secs(),
        }
    }
}

fn default_idle_minutes() -> i64 {
    10
}

fn default_abandon_minutes() -> i64 {
    30
}

fn default_inactivity_sweep_interval_secs() -> u64 {
    120
}
