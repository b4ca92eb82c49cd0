// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded FIFO queue of pending inbound messages, one per conversation.
//!
//! Entries are served strictly FIFO by enqueue order, except for the
//! explicit-removal path, which callers use only for the entry currently
//! bound to processing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use confab_core::ConfabError;
use confab_core::traits::StateStore;
use confab_core::types::{ConversationId, ConversationPhase, QueueEntry};

/// FIFO enqueue/dequeue of pending inbound messages with bounded size and
/// per-entry expiry.
pub struct QueueManager {
    store: Arc<dyn StateStore>,
    max_queue_size: usize,
    message_ttl: Duration,
}

impl QueueManager {
    pub fn new(store: Arc<dyn StateStore>, config: &confab_config::CoordinatorConfig) -> Self {
        Self {
            store,
            max_queue_size: config.max_queue_size,
            message_ttl: config.message_ttl(),
        }
    }

    /// Append an entry, transitioning an idle conversation to queued.
    ///
    /// Returns the entry's 1-based queue position. Fails with
    /// [`ConfabError::QueueFull`] at capacity; the message is never recorded.
    pub async fn enqueue(
        &self,
        id: &ConversationId,
        entry: QueueEntry,
    ) -> Result<usize, ConfabError> {
        let snapshot = self.store.get(id).await?;
        let mut state = snapshot.state;

        if state.message_queue.len() >= self.max_queue_size {
            return Err(ConfabError::QueueFull {
                conversation_id: id.to_string(),
                capacity: self.max_queue_size,
            });
        }

        let message_id = entry.message_id.clone();
        state.message_queue.push(entry);
        if state.phase == ConversationPhase::Idle {
            state.phase = ConversationPhase::Queued;
        }
        let position = state.message_queue.len();
        self.store.set(id, state).await?;

        debug!(
            conversation_id = %id,
            message_id = message_id.as_str(),
            position,
            "message enqueued"
        );
        Ok(position)
    }

    /// Purge expired entries, then peek the head entry without removing it.
    ///
    /// Removal is explicit via [`QueueManager::remove`].
    pub async fn dequeue_next(
        &self,
        id: &ConversationId,
    ) -> Result<Option<QueueEntry>, ConfabError> {
        let snapshot = self.store.get(id).await?;
        let mut state = snapshot.state;

        let now = Utc::now();
        let ttl_secs = self.message_ttl.as_secs() as i64;
        let before = state.message_queue.len();
        state.message_queue.retain(|entry| {
            let expired = entry.age_secs(now) > ttl_secs;
            if expired {
                warn!(
                    conversation_id = %id,
                    message_id = entry.message_id.as_str(),
                    age_secs = entry.age_secs(now),
                    "queue entry expired"
                );
            }
            !expired
        });

        if state.message_queue.len() != before {
            state.recompute_phase();
            self.store.set(id, state.clone()).await?;
        }

        Ok(state.message_queue.first().cloned())
    }

    /// Delete the named entry regardless of position and recompute the phase
    /// (idle if the queue emptied and nothing is processing, else queued).
    ///
    /// Stamps `last_processed_at`. Callers use this only for the entry
    /// currently bound to processing.
    pub async fn remove(
        &self,
        id: &ConversationId,
        message_id: &str,
    ) -> Result<(), ConfabError> {
        let snapshot = self.store.get(id).await?;
        let mut state = snapshot.state;

        let before = state.message_queue.len();
        state.message_queue.retain(|entry| entry.message_id != message_id);

        if state.message_queue.len() == before {
            debug!(
                conversation_id = %id,
                message_id,
                "remove: entry not present in queue"
            );
            return Ok(());
        }

        state.last_processed_at = Some(Utc::now());
        state.recompute_phase();
        self.store.set(id, state).await?;

        debug!(conversation_id = %id, message_id, "queue entry removed");
        Ok(())
    }

    /// Current queue length, after purging nothing (raw read).
    pub async fn len(&self, id: &ConversationId) -> Result<usize, ConfabError> {
        Ok(self.store.get(id).await?.state.message_queue.len())
    }
}
