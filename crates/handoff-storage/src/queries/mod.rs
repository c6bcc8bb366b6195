// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per table family. All functions take `&Database` and
//! run on the single background writer thread.

pub mod messages;
pub mod operators;
pub mod queue;
pub mod sessions;
pub mod sla;
