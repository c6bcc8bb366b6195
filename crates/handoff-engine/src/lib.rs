// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-handoff engine: queueing, SLA tracking, escalation, and
//! inactivity handling for customer chat sessions.
//!
//! [`engine::HandoffEngine`] is the facade the surrounding chat system
//! talks to; [`monitor::MonitorSet`] drives the background sweeps.

pub mod engine;
pub mod escalation;
pub mod inactivity;
pub mod metrics;
pub mod monitor;
pub mod queue;
pub mod shutdown;
pub mod sla;
pub mod state_machine;

pub use engine::{CloseOutcome, HandoffEngine};
pub use monitor::MonitorSet;
