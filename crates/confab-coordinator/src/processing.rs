// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-conversation state machine: idle <-> processing <-> queued.
//!
//! A conversation stuck in processing past the timeout (a lost or crashed
//! worker) is flagged on read and recovered by an explicit reset; the reset
//! only frees the conversation to accept new work, it does not retract the
//! slow inference call itself.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use confab_core::ConfabError;
use confab_core::traits::StateStore;
use confab_core::types::{ConversationId, ConversationPhase};

/// State machine transitions and stuck-processing recovery.
///
/// Store read/write failures propagate to the caller uncaught: the intake
/// path surfaces a transient error to the client, whose own send retry
/// takes over.
pub struct ProcessingManager {
    store: Arc<dyn StateStore>,
}

impl ProcessingManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Whether an inbound message may skip the queue: the conversation is
    /// idle, or its processing state is stuck and due for a reset.
    pub async fn can_process_immediately(
        &self,
        id: &ConversationId,
    ) -> Result<bool, ConfabError> {
        let snapshot = self.store.get(id).await?;
        Ok(snapshot.state.phase == ConversationPhase::Idle || snapshot.needs_reset)
    }

    /// Bind a message to processing.
    ///
    /// A stuck conversation is reset first, as an explicit two-step rather
    /// than a self-call; a second stuck detection on the same call indicates
    /// a logic error and surfaces as [`ConfabError::Internal`].
    pub async fn set_processing(
        &self,
        id: &ConversationId,
        message_id: &str,
    ) -> Result<(), ConfabError> {
        let mut snapshot = self.store.get(id).await?;

        if snapshot.needs_reset {
            warn!(
                conversation_id = %id,
                stuck_message = snapshot.state.currently_processing.as_deref(),
                "resetting stuck processing state before binding"
            );
            self.reset_processing(id).await?;
            snapshot = self.store.get(id).await?;
            if snapshot.needs_reset {
                return Err(ConfabError::Internal(format!(
                    "conversation {id} still stuck after reset"
                )));
            }
        }

        let mut state = snapshot.state;
        state.phase = ConversationPhase::Processing;
        state.currently_processing = Some(message_id.to_string());
        state.processing_started_at = Some(Utc::now());
        self.store.set(id, state).await?;

        debug!(conversation_id = %id, message_id, "processing started");
        Ok(())
    }

    /// Release the processing binding after a message finished.
    ///
    /// A mismatched id logs a warning but proceeds: the system favors
    /// forward progress over strict assertion, since an inconsistency here
    /// indicates a bug upstream, not a reason to halt the conversation.
    pub async fn complete_processing(
        &self,
        id: &ConversationId,
        message_id: &str,
    ) -> Result<(), ConfabError> {
        let snapshot = self.store.get(id).await?;
        let mut state = snapshot.state;

        if state.currently_processing.as_deref() != Some(message_id) {
            warn!(
                conversation_id = %id,
                expected = message_id,
                actual = state.currently_processing.as_deref(),
                "completion for a message that is not currently bound"
            );
        }

        state.currently_processing = None;
        state.processing_started_at = None;
        state.last_processed_at = Some(Utc::now());
        state.recompute_phase();
        self.store.set(id, state).await?;

        debug!(conversation_id = %id, message_id, "processing completed");
        Ok(())
    }

    /// Clear the processing binding without requiring a matching id.
    ///
    /// Used both for explicit recovery and the stuck-timeout path.
    pub async fn reset_processing(&self, id: &ConversationId) -> Result<(), ConfabError> {
        let snapshot = self.store.get(id).await?;
        let mut state = snapshot.state;

        state.currently_processing = None;
        state.processing_started_at = None;
        state.last_processed_at = Some(Utc::now());
        state.recompute_phase();
        let phase = state.phase;
        self.store.set(id, state).await?;

        info!(conversation_id = %id, %phase, "processing state reset");
        Ok(())
    }
}
