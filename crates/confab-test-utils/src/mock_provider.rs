// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock inference provider for deterministic testing.
//!
//! `MockInference` implements `InferenceProvider` with pre-configured
//! replies and injectable failures, enabling fast, CI-runnable tests
//! without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use confab_core::ConfabError;
use confab_core::traits::InferenceProvider;
use confab_core::types::Turn;

/// A scripted outcome for one inference call.
enum Scripted {
    Reply(String),
    Failure(String),
}

/// A mock inference provider that pops scripted outcomes FIFO.
///
/// When the script is exhausted, a default "mock reply" text is returned.
/// Every received turn list is recorded for assertions.
pub struct MockInference {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<Vec<Turn>>>>,
}

impl MockInference {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a provider pre-loaded with the given replies.
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            script: Arc::new(Mutex::new(
                replies.into_iter().map(Scripted::Reply).collect(),
            )),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a reply at the end of the script.
    pub async fn push_reply(&self, text: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Reply(text.into()));
    }

    /// Queue a failure at the end of the script.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Failure(message.into()));
    }

    /// Turn lists received so far, in call order.
    pub async fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceProvider for MockInference {
    async fn complete(&self, turns: Vec<Turn>) -> Result<String, ConfabError> {
        self.calls.lock().await.push(turns);

        match self.script.lock().await.pop_front() {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Failure(message)) => Err(ConfabError::Provider {
                message,
                source: None,
            }),
            None => Ok("mock reply".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_core::types::Sender;

    #[tokio::test]
    async fn default_reply_when_script_empty() {
        let provider = MockInference::new();
        let reply = provider.complete(vec![]).await.unwrap();
        assert_eq!(reply, "mock reply");
    }

    #[tokio::test]
    async fn scripted_replies_returned_in_order() {
        let provider =
            MockInference::with_replies(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(provider.complete(vec![]).await.unwrap(), "first");
        assert_eq!(provider.complete(vec![]).await.unwrap(), "second");
        assert_eq!(provider.complete(vec![]).await.unwrap(), "mock reply");
    }

    #[tokio::test]
    async fn scripted_failure_returns_provider_error() {
        let provider = MockInference::new();
        provider.push_failure("model overloaded").await;
        let err = provider.complete(vec![]).await.unwrap_err();
        assert!(matches!(err, ConfabError::Provider { .. }));
        assert!(err.to_string().contains("model overloaded"));
    }

    #[tokio::test]
    async fn calls_are_recorded() {
        let provider = MockInference::new();
        let turns = vec![Turn::new(Sender::User, "hello")];
        provider.complete(turns.clone()).await.unwrap();

        let calls = provider.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], turns);
        assert_eq!(provider.call_count().await, 1);
    }
}
