// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Handoff engine.

use thiserror::Error;

/// The primary error type used across all Handoff crates.
///
/// SLA violations and queue timeouts are NOT errors — they are observable
/// state transitions recorded by the sweeps. Errors here cover the cases a
/// caller must react to: illegal transitions, missing records, and storage
/// failures.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    ///
    /// Propagated to the caller without retry: a blind retry of a write that
    /// may have landed risks duplicate escalation tickets.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An illegal session state transition was requested.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// No matching record exists for the entity (treated as a no-op by sweeps).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Notifier collaborator failure (best-effort delivery, no acknowledgment).
    #[error("notify error: {message}")]
    Notify {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Ticketing collaborator failure.
    #[error("ticketing error: {message}")]
    Ticketing {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandoffError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(source),
        }
    }
}
