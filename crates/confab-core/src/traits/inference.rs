// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference provider trait: formatted history in, reply text out.

use async_trait::async_trait;

use crate::error::ConfabError;
use crate::types::Turn;

/// The AI inference call, opaque to the coordinator.
///
/// Receives the alternating user/character history (with the newly combined
/// current turn last) and returns reply text. Failures map to an
/// `llm_error` event on the originating message, not to a queue-level
/// failure.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn complete(&self, turns: Vec<Turn>) -> Result<String, ConfabError>;
}
