// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints serde attributes cannot express: response
//! windows shorter than resolution windows, sane clamp ordering, and
//! positive sweep intervals.

use handoff_core::types::Priority;

use crate::diagnostic::ConfigError;
use crate::model::HandoffConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects all validation errors instead of failing fast.
pub fn validate_config(config: &HandoffConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // The SLA invariant: response deadline strictly before resolution
    // deadline, for every priority.
    for priority in [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ] {
        let response = config.sla.response_minutes.for_priority(priority);
        let resolution = config.sla.resolution_minutes.for_priority(priority);
        if response <= 0 {
            errors.push(ConfigError::Validation {
                message: format!(
                    "sla.response_minutes.{priority} must be positive, got {response}"
                ),
            });
        }
        if response >= resolution {
            errors.push(ConfigError::Validation {
                message: format!(
                    "sla.response_minutes.{priority} ({response}) must be less than \
                     sla.resolution_minutes.{priority} ({resolution})"
                ),
            });
        }
    }

    if !(0.0..1.0).contains(&config.sla.warning_fraction) || config.sla.warning_fraction == 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "sla.warning_fraction must be in (0, 1), got {}",
                config.sla.warning_fraction
            ),
        });
    }

    if config.queue.min_wait_minutes > config.queue.max_wait_minutes {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.min_wait_minutes ({}) must not exceed queue.max_wait_minutes ({})",
                config.queue.min_wait_minutes, config.queue.max_wait_minutes
            ),
        });
    }

    if config.queue.avg_handle_minutes <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.avg_handle_minutes must be positive, got {}",
                config.queue.avg_handle_minutes
            ),
        });
    }

    if config.queue.entry_timeout_minutes <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.entry_timeout_minutes must be positive, got {}",
                config.queue.entry_timeout_minutes
            ),
        });
    }

    if config.inactivity.idle_minutes >= config.inactivity.abandon_minutes {
        errors.push(ConfigError::Validation {
            message: format!(
                "inactivity.idle_minutes ({}) must be less than inactivity.abandon_minutes ({})",
                config.inactivity.idle_minutes, config.inactivity.abandon_minutes
            ),
        });
    }

    for (name, interval) in [
        ("sla.sweep_interval_secs", config.sla.sweep_interval_secs),
        (
            "inactivity.sweep_interval_secs",
            config.inactivity.sweep_interval_secs,
        ),
        (
            "queue.cleanup_interval_secs",
            config.queue.cleanup_interval_secs,
        ),
    ] {
        if interval == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be positive"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = HandoffConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = HandoffConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn response_must_be_before_resolution() {
        let mut config = HandoffConfig::default();
        config.sla.response_minutes.high = 500;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("response_minutes.high"))
        ));
    }

    #[test]
    fn warning_fraction_bounds() {
        let mut config = HandoffConfig::default();
        config.sla.warning_fraction = 1.5;
        assert!(validate_config(&config).is_err());

        config.sla.warning_fraction = 0.0;
        assert!(validate_config(&config).is_err());

        config.sla.warning_fraction = 0.8;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn idle_must_be_shorter_than_abandon() {
        let mut config = HandoffConfig::default();
        config.inactivity.idle_minutes = 45;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("idle_minutes"))
        ));
    }

    #[test]
    fn zero_sweep_interval_fails() {
        let mut config = HandoffConfig::default();
        config.sla.sweep_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("sla.sweep_interval_secs"))
        ));
    }
}
