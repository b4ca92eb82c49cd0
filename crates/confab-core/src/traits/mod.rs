// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the coordinator's seams.
//!
//! The transport, durable store, and inference call are external
//! collaborators; these traits are the only surface the coordinator
//! depends on.

pub mod events;
pub mod inference;
pub mod state;

pub use events::EventSink;
pub use inference::InferenceProvider;
pub use state::StateStore;
