// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink trait for pushing coordinator events to the transport layer.

use async_trait::async_trait;

use crate::error::ConfabError;
use crate::types::{ConversationEvent, ConversationId};

/// Outbound side of the real-time transport.
///
/// Delivery is at-least-once with no ordering guarantee across reconnects;
/// clients apply events idempotently, keyed by message id.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emit an event addressed to the conversation's participants.
    async fn emit(
        &self,
        conversation_id: &ConversationId,
        event: ConversationEvent,
    ) -> Result<(), ConfabError>;
}
