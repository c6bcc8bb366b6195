// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Handoff engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use handoff_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("SLA sweep every {}s", config.sla.sweep_interval_secs);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::HandoffConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// The high-level entry point: loads via Figment, then runs
/// post-deserialization validation; Figment errors become miette
/// diagnostics with typo suggestions.
pub fn load_and_validate() -> Result<HandoffConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<HandoffConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("handoff.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("handoff.toml").display().to_string())
            .unwrap_or_else(|_| "handoff.toml".to_string());
        sources.push((path, content));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("handoff/handoff.toml");
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    let system_path = std::path::Path::new("/etc/handoff/handoff.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_config_loads_and_validates() {
        let config = load_and_validate_str(
            r#"
[inactivity]
idle_minutes = 5
abandon_minutes = 20
"#,
        )
        .unwrap();
        assert_eq!(config.inactivity.idle_minutes, 5);
        assert_eq!(config.inactivity.abandon_minutes, 20);
    }

    #[test]
    fn invalid_semantics_surface_as_validation_errors() {
        let errors = load_and_validate_str(
            r#"
[sla]
warning_fraction = 2.0
"#,
        )
        .unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ConfigError::Validation { .. }))
        );
    }

    #[test]
    fn unknown_key_becomes_diagnostic_with_suggestion() {
        let errors = load_and_validate_str(
            r#"
[inactivity]
idle_minuts = 9
"#,
        )
        .unwrap_err();
        let has_suggestion = errors.iter().any(|e| {
            matches!(e, ConfigError::UnknownKey { suggestion: Some(s), .. } if s == "idle_minutes")
        });
        assert!(has_suggestion, "expected a typo suggestion: {errors:?}");
    }
}
