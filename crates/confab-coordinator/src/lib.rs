// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation coordination for Confab.
//!
//! The [`Coordinator`] owns the full inbound-message lifecycle: intake
//! (process now or queue), the idle/processing/queued state machine,
//! strictly FIFO queue advancement, inference dispatch through the
//! configured provider, and the periodic cleanup sweep. State lives behind
//! the [`StateStore`] trait; outcomes are announced through an
//! [`EventSink`].

pub mod cleanup;
pub mod processing;
pub mod queue;

pub use cleanup::{CleanupManager, SweepStats};
pub use processing::ProcessingManager;
pub use queue::QueueManager;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use confab_config::CoordinatorConfig;
use confab_context::ConversationFormatter;
use confab_core::ConfabError;
use confab_core::traits::{EventSink, InferenceProvider, StateStore};
use confab_core::types::{
    ChatMessage, ConversationEvent, ConversationId, InboundMessage, IntakeOutcome, QueueEntry,
};

/// Orchestrates intake, queueing, processing, and cleanup for all
/// conversations.
pub struct Coordinator {
    store: Arc<dyn StateStore>,
    queue: QueueManager,
    processing: ProcessingManager,
    cleanup: Arc<CleanupManager>,
    events: Arc<dyn EventSink>,
    provider: Arc<dyn InferenceProvider>,
    formatter: ConversationFormatter,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn StateStore>,
        events: Arc<dyn EventSink>,
        provider: Arc<dyn InferenceProvider>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            queue: QueueManager::new(store.clone(), config),
            processing: ProcessingManager::new(store.clone()),
            cleanup: Arc::new(CleanupManager::new(store.clone(), config)),
            store,
            events,
            provider,
            formatter: ConversationFormatter::new(),
        }
    }

    /// Spawn the periodic cleanup sweep.
    pub async fn start_cleanup(&self) {
        self.cleanup.start().await;
    }

    /// Cancel the periodic cleanup sweep.
    pub async fn stop_cleanup(&self) {
        self.cleanup.stop().await;
    }

    /// Run one cleanup sweep immediately.
    pub async fn sweep_now(&self) -> SweepStats {
        self.cleanup.sweep().await
    }

    /// Accept an inbound message: process it immediately when the
    /// conversation is idle (or stuck), otherwise append it to the queue.
    ///
    /// A full queue is a normal outcome, reported as
    /// [`IntakeOutcome::Rejected`] rather than an error; the message is not
    /// recorded anywhere.
    pub async fn handle_inbound(
        &self,
        inbound: InboundMessage,
    ) -> Result<IntakeOutcome, ConfabError> {
        let id = inbound.conversation_id();

        if self.processing.can_process_immediately(&id).await? {
            self.processing.set_processing(&id, &inbound.message_id).await?;
            self.emit(
                &id,
                ConversationEvent::Processing {
                    message_id: inbound.message_id.clone(),
                },
            )
            .await;
            debug!(conversation_id = %id, message_id = inbound.message_id.as_str(), "inbound accepted for immediate processing");
            return Ok(IntakeOutcome::Processing);
        }

        let message_id = inbound.message_id.clone();
        match self.queue.enqueue(&id, inbound.into_queue_entry(Utc::now())).await {
            Ok(position) => {
                self.emit(
                    &id,
                    ConversationEvent::Queued {
                        message_id,
                        position,
                    },
                )
                .await;
                Ok(IntakeOutcome::Queued { position })
            }
            Err(ConfabError::QueueFull { capacity, .. }) => {
                warn!(conversation_id = %id, message_id = message_id.as_str(), capacity, "queue full, rejecting message");
                Ok(IntakeOutcome::Rejected {
                    reason: format!("queue full ({capacity} pending messages)"),
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Format the conversation and run inference for the message currently
    /// being processed.
    pub async fn run_inference(
        &self,
        id: &ConversationId,
        history: &[ChatMessage],
        current: &ChatMessage,
    ) -> Result<String, ConfabError> {
        let turns = self.formatter.format_with_current(history, current);
        debug!(conversation_id = %id, turns = turns.len(), "dispatching inference");
        self.provider.complete(turns).await
    }

    /// Finish the named message successfully, link its response, and pull
    /// the next queued entry into processing if one is pending.
    pub async fn complete(
        &self,
        id: &ConversationId,
        message_id: &str,
        response_id: &str,
    ) -> Result<Option<QueueEntry>, ConfabError> {
        self.processing.complete_processing(id, message_id).await?;
        self.emit(
            id,
            ConversationEvent::ResponseLinked {
                response_id: response_id.to_string(),
                reply_to_message_id: message_id.to_string(),
            },
        )
        .await;
        self.advance(id).await
    }

    /// Finish the named message with an inference failure, then pull the
    /// next queued entry into processing if one is pending.
    ///
    /// A failed message does not block the queue; retrying it is the
    /// client's decision.
    pub async fn fail(
        &self,
        id: &ConversationId,
        message_id: &str,
        error_type: &str,
    ) -> Result<Option<QueueEntry>, ConfabError> {
        self.processing.complete_processing(id, message_id).await?;
        self.emit(
            id,
            ConversationEvent::LlmError {
                message_id: message_id.to_string(),
                error_type: error_type.to_string(),
                timestamp: Utc::now(),
            },
        )
        .await;
        self.advance(id).await
    }

    /// Bind the head of the queue to processing, if any entry is pending.
    ///
    /// The entry is bound before its queue slot is released, so a crash in
    /// between leaves it claimed rather than dropped.
    async fn advance(&self, id: &ConversationId) -> Result<Option<QueueEntry>, ConfabError> {
        let Some(entry) = self.queue.dequeue_next(id).await? else {
            return Ok(None);
        };

        self.processing.set_processing(id, &entry.message_id).await?;
        self.queue.remove(id, &entry.message_id).await?;
        self.emit(
            id,
            ConversationEvent::Processing {
                message_id: entry.message_id.clone(),
            },
        )
        .await;

        debug!(conversation_id = %id, message_id = entry.message_id.as_str(), "advanced queue into processing");
        Ok(Some(entry))
    }

    /// Emit an event, logging delivery failures instead of propagating
    /// them. The state transition already happened; losing the
    /// notification must not roll it back.
    async fn emit(&self, id: &ConversationId, event: ConversationEvent) {
        if let Err(error) = self.events.emit(id, event).await {
            warn!(conversation_id = %id, %error, "event delivery failed");
        }
    }

    /// Read-only view of a conversation's state.
    pub async fn snapshot(
        &self,
        id: &ConversationId,
    ) -> Result<confab_core::types::StateSnapshot, ConfabError> {
        self.store.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_core::types::{ConversationPhase, MessageType, Sender};
    use confab_store::MemoryStateStore;
    use confab_test_utils::{MockInference, RecordingSink};

    fn inbound(message_id: &str) -> InboundMessage {
        InboundMessage {
            user_id: "u1".to_string(),
            character_id: "c1".to_string(),
            message_id: message_id.to_string(),
            content: format!("content of {message_id}"),
            message_type: MessageType::Text,
            metadata: None,
            original_timestamp: Utc::now(),
            temp_id: None,
        }
    }

    fn setup() -> (Coordinator, Arc<MemoryStateStore>, RecordingSink, Arc<MockInference>) {
        let config = CoordinatorConfig::default();
        let store = Arc::new(MemoryStateStore::from_config(&config));
        let sink = RecordingSink::default();
        let provider = Arc::new(MockInference::new());
        let coordinator = Coordinator::new(
            store.clone(),
            Arc::new(sink.clone()),
            provider.clone(),
            &config,
        );
        (coordinator, store, sink, provider)
    }

    #[tokio::test]
    async fn first_message_processes_immediately() {
        let (coordinator, store, sink, _provider) = setup();
        let id = ConversationId::for_pair("u1", "c1");

        let outcome = coordinator.handle_inbound(inbound("m1")).await.unwrap();
        assert!(matches!(outcome, IntakeOutcome::Processing));

        let snap = store.get(&id).await.unwrap();
        assert_eq!(snap.state.phase, ConversationPhase::Processing);
        assert_eq!(snap.state.currently_processing.as_deref(), Some("m1"));

        let events = sink.events_for(&id).await;
        assert!(matches!(
            events.as_slice(),
            [ConversationEvent::Processing { message_id }] if message_id == "m1"
        ));
    }

    #[tokio::test]
    async fn second_message_queues_at_position_one() {
        let (coordinator, _store, sink, _provider) = setup();
        let id = ConversationId::for_pair("u1", "c1");

        coordinator.handle_inbound(inbound("m1")).await.unwrap();
        let outcome = coordinator.handle_inbound(inbound("m2")).await.unwrap();
        assert!(matches!(outcome, IntakeOutcome::Queued { position: 1 }));

        let events = sink.events_for(&id).await;
        assert!(matches!(
            events.last(),
            Some(ConversationEvent::Queued { position: 1, .. })
        ));
    }

    #[tokio::test]
    async fn overflow_is_rejected_not_an_error() {
        let (coordinator, _store, _sink, _provider) = setup();

        coordinator.handle_inbound(inbound("m0")).await.unwrap();
        for i in 1..=10 {
            let outcome = coordinator
                .handle_inbound(inbound(&format!("m{i}")))
                .await
                .unwrap();
            assert!(matches!(outcome, IntakeOutcome::Queued { .. }));
        }

        let outcome = coordinator.handle_inbound(inbound("m11")).await.unwrap();
        assert!(matches!(outcome, IntakeOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn complete_links_response_and_advances_queue() {
        let (coordinator, store, sink, _provider) = setup();
        let id = ConversationId::for_pair("u1", "c1");

        coordinator.handle_inbound(inbound("m1")).await.unwrap();
        coordinator.handle_inbound(inbound("m2")).await.unwrap();
        coordinator.handle_inbound(inbound("m3")).await.unwrap();

        let next = coordinator.complete(&id, "m1", "resp_1").await.unwrap().unwrap();
        assert_eq!(next.message_id, "m2");

        let snap = store.get(&id).await.unwrap();
        assert_eq!(snap.state.phase, ConversationPhase::Processing);
        assert_eq!(snap.state.currently_processing.as_deref(), Some("m2"));
        assert_eq!(snap.state.message_queue.len(), 1);
        assert_eq!(snap.state.message_queue[0].message_id, "m3");

        let events = sink.events_for(&id).await;
        assert!(events.iter().any(|e| matches!(
            e,
            ConversationEvent::ResponseLinked { response_id, reply_to_message_id }
                if response_id == "resp_1" && reply_to_message_id == "m1"
        )));
        assert!(matches!(
            events.last(),
            Some(ConversationEvent::Processing { message_id }) if message_id == "m2"
        ));
    }

    #[tokio::test]
    async fn complete_with_empty_queue_goes_idle() {
        let (coordinator, store, _sink, _provider) = setup();
        let id = ConversationId::for_pair("u1", "c1");

        coordinator.handle_inbound(inbound("m1")).await.unwrap();
        let next = coordinator.complete(&id, "m1", "resp_1").await.unwrap();
        assert!(next.is_none());

        let snap = store.get(&id).await.unwrap();
        assert_eq!(snap.state.phase, ConversationPhase::Idle);
    }

    #[tokio::test]
    async fn failure_emits_llm_error_and_advances() {
        let (coordinator, _store, sink, _provider) = setup();
        let id = ConversationId::for_pair("u1", "c1");

        coordinator.handle_inbound(inbound("m1")).await.unwrap();
        coordinator.handle_inbound(inbound("m2")).await.unwrap();

        let next = coordinator.fail(&id, "m1", "timeout").await.unwrap().unwrap();
        assert_eq!(next.message_id, "m2");

        let events = sink.events_for(&id).await;
        assert!(events.iter().any(|e| matches!(
            e,
            ConversationEvent::LlmError { message_id, error_type, .. }
                if message_id == "m1" && error_type == "timeout"
        )));
    }

    #[tokio::test]
    async fn run_inference_formats_and_calls_provider() {
        let (coordinator, _store, _sink, provider) = setup();
        let id = ConversationId::for_pair("u1", "c1");
        provider.push_reply("hello back").await;

        let now = Utc::now();
        let history = vec![
            ChatMessage::user("m0", "hi", now),
            ChatMessage::character("r0", "hello", now),
        ];
        let current = ChatMessage::user("m1", "how are you?", now);

        let reply = coordinator.run_inference(&id, &history, &current).await.unwrap();
        assert_eq!(reply, "hello back");

        let calls = provider.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 3);
        assert_eq!(calls[0][2].role, Sender::User);
        assert_eq!(calls[0][2].content, "how are you?");
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let (coordinator, store, _sink, _provider) = setup();

        coordinator.handle_inbound(inbound("m1")).await.unwrap();
        let mut other = inbound("m2");
        other.user_id = "u2".to_string();
        let outcome = coordinator.handle_inbound(other).await.unwrap();
        // A busy u1 conversation does not queue u2's first message.
        assert!(matches!(outcome, IntakeOutcome::Processing));

        let snap = store.get(&ConversationId::for_pair("u2", "c1")).await.unwrap();
        assert_eq!(snap.state.currently_processing.as_deref(), Some("m2"));
    }
}
