// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State store trait for the shared TTL-backed key-value store.

use async_trait::async_trait;

use crate::error::ConfabError;
use crate::types::{ConversationId, ConversationState, StateSnapshot};

/// Adapter for the shared TTL-backed conversation state store.
///
/// All state mutation is read-modify-write through this boundary: read the
/// current blob, compute the next value, write it back. Two workers racing
/// on the same conversation can clobber each other's write; this is an
/// accepted risk surface at low per-conversation contention.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Return the conversation's state, lazily creating and persisting an
    /// idle default when the key is absent. Never returns "not found".
    ///
    /// The read is side-effect-free beyond lazy creation: a stuck
    /// `Processing` state is annotated via [`StateSnapshot::needs_reset`]
    /// but not mutated in place. The caller performs the reset as a
    /// separate write.
    async fn get(&self, id: &ConversationId) -> Result<StateSnapshot, ConfabError>;

    /// Validate and persist a state blob, stamping `updated_at` and
    /// refreshing the blob's TTL.
    async fn set(&self, id: &ConversationId, state: ConversationState)
    -> Result<(), ConfabError>;

    /// All conversation ids currently present in the store. Used by the
    /// cleanup sweep.
    async fn list_ids(&self) -> Result<Vec<ConversationId>, ConfabError>;

    /// Drop a conversation's state entirely.
    async fn remove(&self, id: &ConversationId) -> Result<(), ConfabError>;
}
