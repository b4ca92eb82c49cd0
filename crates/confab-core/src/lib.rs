// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Confab conversation coordinator.
//!
//! This crate provides the domain types, error type, and adapter traits
//! used throughout the Confab workspace: the conversation state machine
//! blob, queue entries, coordinator events, and the seams to the state
//! store, transport, and inference collaborators.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ConfabError;
pub use types::{
    ChatMessage, ConversationEvent, ConversationId, ConversationPhase, ConversationState,
    InboundMessage, IntakeOutcome, MessageStatus, MessageType, QueueEntry, Sender,
    StateSnapshot, Turn,
};

// Re-export adapter traits at crate root.
pub use traits::{EventSink, InferenceProvider, StateStore};
