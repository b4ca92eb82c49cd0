// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History formatting for Confab inference calls.
//!
//! Turns raw chronological message history into the alternating
//! user/character shape an inference call expects:
//! - Errored turns are dropped up front
//! - Rapid-fire user messages merge into one combined turn
//! - The in-flight message folds into a trailing user turn instead of
//!   creating two consecutive ones
//!
//! Also exposes a pattern validator for observability.

pub mod alternating;
pub mod validation;

pub use alternating::{
    MULTIPLE_NON_TEXT_PLACEHOLDER, combine_consecutive_user_messages,
    handle_current_message_with_history, reorganize_to_alternating,
};
pub use validation::{PatternIssue, PatternReport, validate_conversation_pattern};

use confab_core::types::{ChatMessage, Turn};

/// Entry point tying the reorganization steps into provider-ready turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationFormatter;

impl ConversationFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format raw history into alternating turns for an inference call.
    pub fn format_history(&self, messages: &[ChatMessage]) -> Vec<Turn> {
        to_turns(&reorganize_to_alternating(messages))
    }

    /// Format raw history plus the in-flight message being processed.
    ///
    /// The in-flight message merges into a trailing user turn when one
    /// exists, so the provider always sees a single current user turn.
    pub fn format_with_current(&self, messages: &[ChatMessage], current: &ChatMessage) -> Vec<Turn> {
        let history = reorganize_to_alternating(messages);
        to_turns(&handle_current_message_with_history(history, current))
    }

    /// Structural validation of the raw history; observability only.
    pub fn validate(&self, messages: &[ChatMessage]) -> PatternReport {
        validate_conversation_pattern(messages)
    }
}

fn to_turns(messages: &[ChatMessage]) -> Vec<Turn> {
    messages
        .iter()
        .map(|m| Turn {
            role: m.sender,
            content: m.content.clone(),
            combined_count: m.combined_count,
        })
        .collect()
}
