// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL-backed conversation state persistence for the Confab coordinator.
//!
//! The state blob is a liveness mechanism, not a log: every entry carries a
//! write-refreshed TTL, and an expired conversation simply restarts as idle.
//! The [`MemoryStateStore`] is the in-process implementation of the
//! [`confab_core::StateStore`] trait; a networked key-value store with
//! per-key TTL can be swapped in behind the same trait.

pub mod memory;

pub use memory::MemoryStateStore;
