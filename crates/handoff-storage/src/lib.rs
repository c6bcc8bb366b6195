// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Handoff engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for queue
//! entries, SLA records, sessions, operators, and the message log.

pub mod database;
pub mod migrations;
pub(crate) mod models;
pub mod queries;

pub use database::Database;
