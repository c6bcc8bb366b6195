// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `handoff status` command implementation.
//!
//! Read-only: prints the current queue snapshot and SLA performance from
//! the configured database.

use std::sync::Arc;

use handoff_config::model::HandoffConfig;
use handoff_core::HandoffError;
use handoff_engine::HandoffEngine;
use handoff_storage::Database;

use crate::collaborators::{LogNotifier, LogTicketing};

/// Runs the `handoff status` command.
pub async fn run_status(config: HandoffConfig, days: i64) -> Result<(), HandoffError> {
    let db = Arc::new(Database::open(&config.storage.database_path).await?);
    let engine = HandoffEngine::new(db, &config, Arc::new(LogNotifier), Arc::new(LogTicketing));

    let queue = engine.queue_stats().await?;
    println!("Queue");
    println!("  waiting:  {}", queue.waiting);
    println!("  assigned: {}", queue.assigned);
    for (priority, count) in &queue.waiting_by_priority {
        println!("    {priority}: {count}");
    }
    match queue.average_wait_minutes {
        Some(avg) => println!("  average wait: {avg:.1} min"),
        None => println!("  average wait: n/a"),
    }

    let sla = engine.sla_metrics(days).await?;
    println!("SLA (last {} days)", sla.window_days);
    println!("  open:      {}", sla.open);
    println!("  violated:  {}", sla.violated);
    println!("  completed: {}", sla.completed);
    for m in &sla.by_priority {
        let response = m
            .avg_response_minutes
            .map(|v| format!("{v:.1} min"))
            .unwrap_or_else(|| "n/a".to_string());
        let resolution = m
            .avg_resolution_minutes
            .map(|v| format!("{v:.1} min"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "    {}: total {}, violated {}, on-time responses {}, avg response {}, avg resolution {}",
            m.priority, m.total, m.violated, m.responses_on_time, response, resolution
        );
    }

    Ok(())
}
