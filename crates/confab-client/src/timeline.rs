// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The optimistic message timeline.
//!
//! A client renders a sent message immediately and reconciles it against
//! server-pushed events afterwards. All event application is idempotent
//! and keyed by message id only; content-based dedup is deliberately not
//! used, since users legitimately repeat themselves.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use confab_core::ConfabError;
use confab_core::types::{ChatMessage, ConversationEvent, MessageStatus, Sender};

/// One client-side conversation view, reconciled against coordinator
/// events.
#[derive(Debug, Default)]
pub struct MessageTimeline {
    messages: Vec<ChatMessage>,
    /// Ids sent optimistically and not yet acknowledged.
    pending: HashSet<String>,
    /// Late-bound response id to originating user message id.
    response_links: HashMap<String, String>,
    /// Last known queue position per message id.
    queue_positions: HashMap<String, usize>,
    max_retries: u32,
}

impl MessageTimeline {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn from_config(config: &confab_config::CoordinatorConfig) -> Self {
        Self::new(config.max_retries)
    }

    /// Render a just-typed message immediately with a locally generated id,
    /// before the server has acknowledged it. Returns the id.
    pub fn send_optimistic(&mut self, content: impl Into<String>) -> String {
        let id = Uuid::new_v4().to_string();
        let mut message = ChatMessage::user(id.clone(), content, Utc::now());
        message.status = MessageStatus::Sending;
        self.messages.push(message);
        self.pending.insert(id.clone());
        id
    }

    /// Server acknowledged the send. Clears the pending marker.
    pub fn confirm_sent(&mut self, message_id: &str) {
        self.pending.remove(message_id);
        if let Some(message) = self.get_mut(message_id) {
            if message.status == MessageStatus::Sending {
                message.status = MessageStatus::Sent;
            }
        }
    }

    /// The send itself failed (never reached the coordinator).
    pub fn mark_send_failed(&mut self, message_id: &str) {
        self.pending.remove(message_id);
        if let Some(message) = self.get_mut(message_id) {
            message.status = MessageStatus::Failed;
        }
    }

    /// Apply one server-pushed status event. Safe to replay: every branch
    /// is a plain overwrite keyed by message id.
    pub fn apply_event(&mut self, event: &ConversationEvent) {
        match event {
            ConversationEvent::Queued {
                message_id,
                position,
            } => {
                self.queue_positions.insert(message_id.clone(), *position);
                if let Some(message) = self.get_mut(message_id) {
                    message.status = MessageStatus::Queued;
                } else {
                    debug!(message_id, "queued event for unknown message");
                }
            }
            ConversationEvent::Processing { message_id } => {
                self.queue_positions.remove(message_id);
                if let Some(message) = self.get_mut(message_id) {
                    message.status = MessageStatus::Processing;
                }
            }
            ConversationEvent::LlmError {
                message_id,
                error_type,
                timestamp,
            } => {
                if let Some(message) = self.get_mut(message_id) {
                    message.has_llm_error = true;
                    message.error_type = Some(error_type.clone());
                    message.error_timestamp = Some(*timestamp);
                } else {
                    warn!(message_id, error_type, "llm error for unknown message");
                }
            }
            ConversationEvent::ResponseLinked {
                response_id,
                reply_to_message_id,
            } => {
                self.response_links
                    .insert(response_id.clone(), reply_to_message_id.clone());
                if let Some(response) = self.get_mut(response_id) {
                    if response.reply_to_message_id.is_none() {
                        response.reply_to_message_id = Some(reply_to_message_id.clone());
                    }
                }
            }
        }
    }

    /// Insert a finished message into the timeline.
    ///
    /// A message whose exact id is already present is dropped and `false`
    /// is returned. A character reply carrying `reply_to_message_id` marks
    /// the referenced user message delivered and clears any LLM-error flags
    /// on it, since a later success resolves the transient failure.
    pub fn receive(&mut self, message: ChatMessage) -> bool {
        if self.get(&message.id).is_some() {
            debug!(message_id = message.id.as_str(), "duplicate receive ignored");
            return false;
        }

        self.pending.remove(&message.id);

        if message.sender == Sender::Character {
            if let Some(reply_to) = message.reply_to_message_id.clone() {
                if let Some(original) = self.get_mut(&reply_to) {
                    original.status = MessageStatus::Delivered;
                    if original.has_llm_error {
                        original.has_llm_error = false;
                        original.error_type = None;
                        original.error_timestamp = None;
                    }
                }
            }
        }

        self.messages.push(message);
        true
    }

    /// Whether the UI should render "replying to" context for a response.
    ///
    /// Linking resolves ambiguity; with at most one unanswered user message
    /// there is nothing ambiguous, so the context is suppressed.
    pub fn should_show_reply_context(&self, response_id: &str) -> bool {
        self.response_links.contains_key(response_id) && self.unanswered_user_count() > 1
    }

    /// Re-issue a message flagged with an LLM error, against the same id.
    ///
    /// Returns the new retry count. At the retry budget the message is
    /// left visible but permanently failed, and the call is rejected with
    /// [`ConfabError::RetryLimit`].
    pub fn retry_llm_error(&mut self, message_id: &str) -> Result<u32, ConfabError> {
        let max_retries = self.max_retries;
        let Some(message) = self.get_mut(message_id) else {
            return Err(ConfabError::InvalidState(format!(
                "cannot retry unknown message {message_id}"
            )));
        };
        if !message.has_llm_error {
            return Err(ConfabError::InvalidState(format!(
                "message {message_id} has no error to retry"
            )));
        }
        if message.retry_count >= max_retries {
            message.status = MessageStatus::Failed;
            return Err(ConfabError::RetryLimit {
                message_id: message_id.to_string(),
                max_retries,
            });
        }

        message.retry_count += 1;
        message.status = MessageStatus::Retrying;
        debug!(
            message_id,
            retry_count = message.retry_count,
            "retrying message with llm error"
        );
        Ok(message.retry_count)
    }

    /// Whether the retry affordance should still be offered for a message.
    pub fn can_retry(&self, message_id: &str) -> bool {
        self.get(message_id)
            .is_some_and(|m| m.has_llm_error && m.retry_count < self.max_retries)
    }

    /// Re-send a message whose original send never went through.
    ///
    /// Unlike [`MessageTimeline::retry_llm_error`], the failed message is
    /// discarded and replaced by a brand-new message with a fresh id,
    /// which is returned. A message that failed by exhausting its LLM-error
    /// retry budget is not eligible; it stays permanently failed.
    pub fn retry_failed_send(&mut self, message_id: &str) -> Result<String, ConfabError> {
        let position = self
            .messages
            .iter()
            .position(|m| {
                m.id == message_id && m.status == MessageStatus::Failed && !m.has_llm_error
            })
            .ok_or_else(|| {
                ConfabError::InvalidState(format!(
                    "no failed message {message_id} to re-send"
                ))
            })?;

        let old = self.messages.remove(position);
        self.pending.remove(&old.id);
        Ok(self.send_optimistic(old.content))
    }

    /// Flip a like on a message for the given liker.
    ///
    /// Liker ids are independent; a synthetic `ai_<characterId>` like and
    /// the user's own like coexist on the same message.
    pub fn toggle_like(&mut self, message_id: &str, liker_id: &str) -> bool {
        let Some(message) = self.get_mut(message_id) else {
            return false;
        };
        let liked = message.likes.entry(liker_id.to_string()).or_insert(false);
        *liked = !*liked;
        *liked
    }

    /// Flip the character's synthetic like on a message.
    pub fn ai_like(&mut self, message_id: &str, character_id: &str) -> bool {
        self.toggle_like(message_id, &ChatMessage::ai_liker_id(character_id))
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, message_id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn is_pending(&self, message_id: &str) -> bool {
        self.pending.contains(message_id)
    }

    pub fn queue_position(&self, message_id: &str) -> Option<usize> {
        self.queue_positions.get(message_id).copied()
    }

    /// The user message a response was linked to, if a link arrived.
    pub fn response_target(&self, response_id: &str) -> Option<&str> {
        self.response_links.get(response_id).map(String::as_str)
    }

    fn get_mut(&mut self, message_id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// User messages with no character reply yet.
    fn unanswered_user_count(&self) -> usize {
        let answered: HashSet<&str> = self
            .messages
            .iter()
            .filter(|m| m.sender == Sender::Character)
            .filter_map(|m| m.reply_to_message_id.as_deref())
            .chain(self.response_links.values().map(String::as_str))
            .collect();

        self.messages
            .iter()
            .filter(|m| m.sender == Sender::User)
            .filter(|m| !answered.contains(m.id.as_str()))
            .filter(|m| m.status != MessageStatus::Delivered)
            .count()
    }
}
