// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process TTL-backed state store built on [`moka`].
//!
//! Each conversation's state blob lives under its [`ConversationId`] key
//! with a write-refreshed TTL: moka's `time_to_live` counts from the last
//! insert or update, so every `set` extends the blob's life by the full
//! TTL window. An expired key simply vanishes, which the coordinator treats
//! as a fresh idle conversation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use tracing::debug;

use confab_core::error::ConfabError;
use confab_core::traits::StateStore;
use confab_core::types::{ConversationId, ConversationState, StateSnapshot};

/// Shared in-memory conversation state store with per-entry TTL.
///
/// Cloneable: clones share the underlying cache, mirroring how multiple
/// request workers share one external key-value store.
#[derive(Clone)]
pub struct MemoryStateStore {
    cache: Cache<ConversationId, ConversationState>,
    processing_timeout: Duration,
}

impl MemoryStateStore {
    /// Create a store with the given state blob TTL and processing timeout.
    pub fn new(state_ttl: Duration, processing_timeout: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(state_ttl)
            .build();
        Self {
            cache,
            processing_timeout,
        }
    }

    /// Create a store from coordinator configuration.
    pub fn from_config(config: &confab_config::CoordinatorConfig) -> Self {
        Self::new(config.state_ttl(), config.processing_timeout())
    }

    /// Number of live (non-expired) conversations. Test/diagnostic use.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, id: &ConversationId) -> Result<StateSnapshot, ConfabError> {
        let now = Utc::now();
        let state = match self.cache.get(id).await {
            Some(state) => state,
            None => {
                // Absence of the key is equivalent to a fresh idle state,
                // created lazily on first read.
                let state = ConversationState::new_idle(now);
                debug!(conversation_id = %id, "initialized conversation state");
                self.cache.insert(id.clone(), state.clone()).await;
                state
            }
        };

        Ok(StateSnapshot::evaluate(state, self.processing_timeout, now))
    }

    async fn set(
        &self,
        id: &ConversationId,
        mut state: ConversationState,
    ) -> Result<(), ConfabError> {
        state
            .check_invariants()
            .map_err(ConfabError::InvalidState)?;
        state.updated_at = Utc::now();
        // Insert refreshes the entry's TTL.
        self.cache.insert(id.clone(), state).await;
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<ConversationId>, ConfabError> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.iter().map(|(k, _)| (*k).clone()).collect())
    }

    async fn remove(&self, id: &ConversationId) -> Result<(), ConfabError> {
        self.cache.invalidate(id).await;
        Ok(())
    }
}
