// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `handoff serve` command implementation.
//!
//! Opens the database, assembles the engine with the default logging
//! collaborators, spawns the background sweep loops, and waits for
//! SIGINT/SIGTERM before draining them.

use std::sync::Arc;

use handoff_config::model::HandoffConfig;
use handoff_core::HandoffError;
use handoff_engine::monitor::MonitorSet;
use handoff_engine::{HandoffEngine, shutdown};
use handoff_storage::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::collaborators::{LogNotifier, LogTicketing};

/// Runs the `handoff serve` command.
pub async fn run_serve(config: HandoffConfig) -> Result<(), HandoffError> {
    init_tracing(&config.engine.log_level);

    info!("starting handoff serve");

    ensure_parent_dir(&config.storage.database_path)?;
    let db = Arc::new(Database::open(&config.storage.database_path).await?);
    info!(path = %config.storage.database_path, "database ready");

    let engine = Arc::new(HandoffEngine::new(
        db,
        &config,
        Arc::new(LogNotifier),
        Arc::new(LogTicketing),
    ));
    let monitors = MonitorSet::spawn(engine, &config);

    let token = shutdown::install_signal_handler();
    token.cancelled().await;

    info!("draining background monitors");
    monitors.shutdown().await;
    info!("handoff serve stopped");
    Ok(())
}

/// Initialize the tracing subscriber, honoring `RUST_LOG` over the
/// configured level.
fn init_tracing(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn ensure_parent_dir(database_path: &str) -> Result<(), HandoffError> {
    if let Some(parent) = std::path::Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| HandoffError::Storage { source: e.into() })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/handoff.db");
        ensure_parent_dir(&nested.to_string_lossy()).unwrap();
        assert!(nested.parent().unwrap().is_dir());
    }

    #[test]
    fn bare_filename_needs_no_parent() {
        ensure_parent_dir("handoff.db").unwrap();
    }
}
