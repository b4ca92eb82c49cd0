// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording event sink for asserting on coordinator-emitted events.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use confab_core::ConfabError;
use confab_core::traits::EventSink;
use confab_core::types::{ConversationEvent, ConversationId};

/// An event sink that records every emitted event in order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<(ConversationId, ConversationEvent)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in emission order.
    pub async fn events(&self) -> Vec<(ConversationId, ConversationEvent)> {
        self.events.lock().await.clone()
    }

    /// Events addressed to a single conversation.
    pub async fn events_for(&self, id: &ConversationId) -> Vec<ConversationEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(event_id, _)| event_id == id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(
        &self,
        conversation_id: &ConversationId,
        event: ConversationEvent,
    ) -> Result<(), ConfabError> {
        self.events
            .lock()
            .await
            .push((conversation_id.clone(), event));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_events_per_conversation() {
        let sink = RecordingSink::new();
        let a = ConversationId::for_pair("u1", "c1");
        let b = ConversationId::for_pair("u2", "c1");

        sink.emit(
            &a,
            ConversationEvent::Processing {
                message_id: "m1".to_string(),
            },
        )
        .await
        .unwrap();
        sink.emit(
            &b,
            ConversationEvent::Queued {
                message_id: "m2".to_string(),
                position: 1,
            },
        )
        .await
        .unwrap();

        assert_eq!(sink.events().await.len(), 2);
        let for_a = sink.events_for(&a).await;
        assert_eq!(for_a.len(), 1);
        assert!(matches!(for_a[0], ConversationEvent::Processing { .. }));
    }

    #[tokio::test]
    async fn clear_empties_the_log() {
        let sink = RecordingSink::new();
        let id = ConversationId::for_pair("u1", "c1");
        sink.emit(
            &id,
            ConversationEvent::Processing {
                message_id: "m1".to_string(),
            },
        )
        .await
        .unwrap();
        sink.clear().await;
        assert!(sink.events().await.is_empty());
    }
}
