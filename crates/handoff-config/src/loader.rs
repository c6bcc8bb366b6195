// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./handoff.toml` > `~/.config/handoff/handoff.toml`
//! > `/etc/handoff/handoff.toml` with environment variable overrides via the
//! `HANDOFF_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HandoffConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/handoff/handoff.toml` (system-wide)
/// 3. `~/.config/handoff/handoff.toml` (user XDG config)
/// 4. `./handoff.toml` (local directory)
/// 5. `HANDOFF_*` environment variables
pub fn load_config() -> Result<HandoffConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<HandoffConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HandoffConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HandoffConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HandoffConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use so callers can inspect metadata before extraction).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HandoffConfig::default()))
        .merge(Toml::file("/etc/handoff/handoff.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("handoff/handoff.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("handoff.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `HANDOFF_SLA_SWEEP_INTERVAL_SECS` must
/// map to `sla.sweep_interval_secs`, not `sla.sweep.interval.secs`.
fn env_provider() -> Env {
    Env::prefixed("HANDOFF_").map(|key| {
        // The key arrives with the environment's original (upper) case.
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("engine_", "engine.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("sla_", "sla.", 1)
            .replacen("inactivity_", "inactivity.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_extract_without_files() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.sla.response_minutes.high, 5);
        assert_eq!(config.inactivity.idle_minutes, 10);
        assert_eq!(config.queue.max_wait_minutes, 30);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[sla]
sweep_interval_secs = 15

[sla.response_minutes]
urgent = 1
high = 3
medium = 10
low = 20
"#,
        )
        .unwrap();
        assert_eq!(config.sla.sweep_interval_secs, 15);
        assert_eq!(config.sla.response_minutes.high, 3);
        // Untouched sections keep defaults.
        assert_eq!(config.sla.resolution_minutes.low, 1440);
    }

    #[test]
    fn env_vars_override_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("handoff.toml", "[queue]\nmax_wait_minutes = 45\n")?;
            jail.set_env("HANDOFF_QUEUE_MAX_WAIT_MINUTES", "20");
            let config = load_config_from_path(Path::new("handoff.toml")).unwrap();
            assert_eq!(config.queue.max_wait_minutes, 20);
            Ok(())
        });
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
[queue]
avg_handel_minutes = 7
"#,
        );
        assert!(result.is_err());
    }
}
