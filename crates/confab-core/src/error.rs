// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Confab conversation coordinator.

use thiserror::Error;

/// The primary error type used across all Confab adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ConfabError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// State store errors (connection, serialization, lost writes).
    ///
    /// Never retried locally: the intake path propagates these to the caller,
    /// whose client-side send retry takes over.
    #[error("state store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Inference provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport/event-sink errors (delivery failure, closed channel).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The conversation's pending-message queue is at capacity.
    ///
    /// Surfaced synchronously to the sender; the message is never recorded.
    #[error("queue full for conversation {conversation_id} (capacity {capacity})")]
    QueueFull {
        conversation_id: String,
        capacity: usize,
    },

    /// A message has exhausted its retry budget and is permanently failed.
    #[error("retry limit reached for message {message_id} (max {max_retries})")]
    RetryLimit { message_id: String, max_retries: u32 },

    /// A state blob failed schema validation at the store boundary.
    #[error("invalid conversation state: {0}")]
    InvalidState(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
