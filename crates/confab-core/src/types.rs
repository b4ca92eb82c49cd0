// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Confab coordinator, formatter, and client crates.
//!
//! The conversation state blob is the only shared mutable resource in the
//! subsystem. It is always read and written through the [`crate::traits::StateStore`]
//! boundary so TTL refresh and schema validation stay centralized.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation: one per user-character pair.
///
/// The wire form is `<user_id>_<character_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Build the canonical id for a user-character pair.
    pub fn for_pair(user_id: &str, character_id: &str) -> Self {
        Self(format!("{user_id}_{character_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three phases of a conversation's processing state machine.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationPhase {
    /// No work bound or waiting.
    #[default]
    Idle,
    /// Exactly one message is bound to an in-flight inference call.
    Processing,
    /// Work is waiting in the queue; nothing is bound.
    Queued,
}

/// A pending inbound message awaiting its turn to be bound to processing.
///
/// Created on enqueue, removed on dequeue-for-processing or TTL expiry,
/// never mutated otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub message_id: String,
    pub user_id: String,
    pub character_id: String,
    /// Opaque payload forwarded to the inference pipeline.
    pub message_data: serde_json::Value,
    /// Server receipt time; drives expiry.
    pub queued_at: DateTime<Utc>,
    /// Client-perceived send time; drives ordering across reconnects.
    pub original_timestamp: DateTime<Utc>,
    /// Client-generated correlation id for optimistic-send reconciliation.
    pub temp_id: Option<String>,
}

impl QueueEntry {
    /// Age of this entry relative to `now`, in whole seconds.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.queued_at).num_seconds()
    }
}

/// The per-conversation state blob held in the shared TTL-backed store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub phase: ConversationPhase,
    /// FIFO by enqueue order; bounded by the configured queue capacity.
    #[serde(default)]
    pub message_queue: Vec<QueueEntry>,
    /// Id of the message currently bound to an inference call, if any.
    #[serde(default)]
    pub currently_processing: Option<String>,
    #[serde(default)]
    pub processing_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// A fresh idle state, as lazily created on first read of an absent key.
    pub fn new_idle(now: DateTime<Utc>) -> Self {
        Self {
            phase: ConversationPhase::Idle,
            message_queue: Vec::new(),
            currently_processing: None,
            processing_started_at: None,
            last_processed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Verify the phase/queue/binding invariants.
    ///
    /// - `Processing` requires a bound message id.
    /// - `Idle` requires an empty queue and no bound message.
    /// - `Queued` requires a non-empty queue and no bound message.
    pub fn check_invariants(&self) -> Result<(), String> {
        match self.phase {
            ConversationPhase::Processing => {
                if self.currently_processing.is_none() {
                    return Err("processing phase with no bound message".to_string());
                }
            }
            ConversationPhase::Idle => {
                if !self.message_queue.is_empty() {
                    return Err("idle phase with non-empty queue".to_string());
                }
                if self.currently_processing.is_some() {
                    return Err("idle phase with a bound message".to_string());
                }
            }
            ConversationPhase::Queued => {
                if self.message_queue.is_empty() {
                    return Err("queued phase with empty queue".to_string());
                }
                if self.currently_processing.is_some() {
                    return Err("queued phase with a bound message".to_string());
                }
            }
        }
        Ok(())
    }

    /// Recompute the phase after queue mutation: idle when nothing is queued
    /// and nothing is bound, otherwise queued. A bound message keeps the
    /// phase at processing.
    pub fn recompute_phase(&mut self) {
        self.phase = if self.currently_processing.is_some() {
            ConversationPhase::Processing
        } else if self.message_queue.is_empty() {
            ConversationPhase::Idle
        } else {
            ConversationPhase::Queued
        };
    }
}

/// A state read plus its staleness annotation.
///
/// Produced by every [`crate::traits::StateStore::get`]; never persisted.
/// The read itself is side-effect-free: when `needs_reset` is set, the
/// caller performs the reset as a separate write.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub state: ConversationState,
    /// True when the conversation has been stuck in `Processing` longer
    /// than the processing timeout (a lost or crashed worker).
    pub needs_reset: bool,
}

impl StateSnapshot {
    /// Evaluate staleness for a freshly read state.
    pub fn evaluate(
        state: ConversationState,
        processing_timeout: std::time::Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let needs_reset = state.phase == ConversationPhase::Processing
            && state
                .processing_started_at
                .is_some_and(|started| {
                    (now - started).num_seconds() > processing_timeout.as_secs() as i64
                });
        Self { state, needs_reset }
    }
}

/// Who authored a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Character,
    /// Tolerated on deserialization; the formatter skips these with a warning.
    #[serde(other)]
    Unknown,
}

/// Content kind of a chat message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Audio,
    System,
}

/// Delivery status of a chat message, as tracked by the client timeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Queued,
    Processing,
    Sent,
    Delivered,
    Failed,
    Retrying,
}

/// A message in the conversation timeline.
///
/// Owned by the durable store; the coordinator only orchestrates when a
/// message may be processed. The client holds a possibly stale projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    /// Back-reference to the user message a character reply answers.
    #[serde(default)]
    pub reply_to_message_id: Option<String>,
    #[serde(default)]
    pub has_llm_error: bool,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retry_count: u32,
    /// Liker id -> liked. A synthetic `ai_<character_id>` liker is a
    /// first-class like source distinct from the human user's own like.
    #[serde(default)]
    pub likes: HashMap<String, bool>,
    /// How many raw user messages were merged into this turn, when the
    /// formatter combined a rapid-fire run. Diagnostics only.
    #[serde(default)]
    pub combined_count: Option<usize>,
}

impl ChatMessage {
    /// A user-authored text message with the given id.
    pub fn user(id: impl Into<String>, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            sender: Sender::User,
            content: content.into(),
            message_type: MessageType::Text,
            timestamp,
            status: MessageStatus::Sent,
            reply_to_message_id: None,
            has_llm_error: false,
            error_type: None,
            error_timestamp: None,
            retry_count: 0,
            likes: HashMap::new(),
            combined_count: None,
        }
    }

    /// A character-authored text message with the given id.
    pub fn character(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sender: Sender::Character,
            ..Self::user(id, content, timestamp)
        }
    }

    /// The synthetic liker id used for AI-originated likes.
    pub fn ai_liker_id(character_id: &str) -> String {
        format!("ai_{character_id}")
    }
}

/// One alternating unit in the AI-facing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Sender,
    pub content: String,
    /// Number of raw messages merged into this turn, when more than one.
    #[serde(default)]
    pub combined_count: Option<usize>,
}

impl Turn {
    pub fn new(role: Sender, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            combined_count: None,
        }
    }
}

/// Events the coordinator pushes to a conversation's participants.
///
/// These are the only channel by which clients learn of state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A message was accepted into the pending queue.
    Queued { message_id: String, position: usize },
    /// A message was bound to an inference call.
    Processing { message_id: String },
    /// The inference call for a message failed; recoverable via retry.
    LlmError {
        message_id: String,
        error_type: String,
        timestamp: DateTime<Utc>,
    },
    /// Late-bound linking of an AI reply to its originating user message.
    ResponseLinked {
        response_id: String,
        reply_to_message_id: String,
    },
}

/// An inbound user message as delivered by the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub user_id: String,
    pub character_id: String,
    /// Client-generated message id (optimistic send).
    pub message_id: String,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Client-perceived send time.
    pub original_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub temp_id: Option<String>,
}

impl InboundMessage {
    pub fn conversation_id(&self) -> ConversationId {
        ConversationId::for_pair(&self.user_id, &self.character_id)
    }

    /// Convert to a queue entry stamped with the given receipt time.
    pub fn into_queue_entry(self, queued_at: DateTime<Utc>) -> QueueEntry {
        QueueEntry {
            message_id: self.message_id,
            user_id: self.user_id,
            character_id: self.character_id,
            message_data: serde_json::json!({
                "content": self.content,
                "type": self.message_type,
                "metadata": self.metadata,
            }),
            queued_at,
            original_timestamp: self.original_timestamp,
            temp_id: self.temp_id,
        }
    }
}

/// The coordinator's synchronous answer to a message-intake call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    /// Accepted and bound to processing immediately.
    Processing,
    /// Accepted and queued at the given 1-based position.
    Queued { position: usize },
    /// Rejected; the message was never recorded.
    Rejected { reason: String },
}
