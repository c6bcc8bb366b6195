// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Handoff: mock collaborators and an end-to-end harness.

pub mod harness;
pub mod mock_notifier;
pub mod mock_ticketing;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_notifier::MockNotifier;
pub use mock_ticketing::MockTicketing;
