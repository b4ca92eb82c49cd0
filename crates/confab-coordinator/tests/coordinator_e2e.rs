// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end lifecycle tests driving the coordinator through the public
//! surface only: intake, queueing, inference, completion, failure, stuck
//! recovery, and the cleanup sweep.

use std::sync::Arc;

use chrono::Utc;

use confab_config::CoordinatorConfig;
use confab_coordinator::Coordinator;
use confab_core::traits::StateStore;
use confab_core::types::{
    ChatMessage, ConversationEvent, ConversationId, ConversationPhase, InboundMessage,
    IntakeOutcome, MessageType,
};
use confab_store::MemoryStateStore;
use confab_test_utils::{MockInference, RecordingSink};

fn inbound(user: &str, message_id: &str, content: &str) -> InboundMessage {
    InboundMessage {
        user_id: user.to_string(),
        character_id: "luna".to_string(),
        message_id: message_id.to_string(),
        content: content.to_string(),
        message_type: MessageType::Text,
        metadata: None,
        original_timestamp: Utc::now(),
        temp_id: Some(format!("temp_{message_id}")),
    }
}

struct Harness {
    coordinator: Coordinator,
    store: Arc<MemoryStateStore>,
    sink: RecordingSink,
    provider: Arc<MockInference>,
}

fn harness() -> Harness {
    let config = CoordinatorConfig::default();
    let store = Arc::new(MemoryStateStore::from_config(&config));
    let sink = RecordingSink::new();
    let provider = Arc::new(MockInference::new());
    let coordinator = Coordinator::new(
        store.clone(),
        Arc::new(sink.clone()),
        provider.clone(),
        &config,
    );
    Harness {
        coordinator,
        store,
        sink,
        provider,
    }
}

#[tokio::test]
async fn rapid_fire_messages_serialize_through_the_queue() {
    let h = harness();
    let id = ConversationId::for_pair("alice", "luna");

    // Three messages in quick succession.
    let first = h
        .coordinator
        .handle_inbound(inbound("alice", "m1", "hello"))
        .await
        .unwrap();
    assert!(matches!(first, IntakeOutcome::Processing));

    let second = h
        .coordinator
        .handle_inbound(inbound("alice", "m2", "are you there?"))
        .await
        .unwrap();
    assert!(matches!(second, IntakeOutcome::Queued { position: 1 }));

    let third = h
        .coordinator
        .handle_inbound(inbound("alice", "m3", "hello??"))
        .await
        .unwrap();
    assert!(matches!(third, IntakeOutcome::Queued { position: 2 }));

    // First completes; the second is pulled straight into processing and
    // exactly one entry remains queued.
    let next = h.coordinator.complete(&id, "m1", "resp_1").await.unwrap();
    assert_eq!(next.unwrap().message_id, "m2");

    let snap = h.store.get(&id).await.unwrap();
    assert_eq!(snap.state.phase, ConversationPhase::Processing);
    assert_eq!(snap.state.currently_processing.as_deref(), Some("m2"));
    assert_eq!(snap.state.message_queue.len(), 1);

    // Drain the rest.
    let next = h.coordinator.complete(&id, "m2", "resp_2").await.unwrap();
    assert_eq!(next.unwrap().message_id, "m3");
    let next = h.coordinator.complete(&id, "m3", "resp_3").await.unwrap();
    assert!(next.is_none());

    let snap = h.store.get(&id).await.unwrap();
    assert_eq!(snap.state.phase, ConversationPhase::Idle);
    assert!(snap.state.message_queue.is_empty());

    // Event order tells the client the whole story.
    let events = h.sink.events_for(&id).await;
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            ConversationEvent::Processing { .. } => "processing",
            ConversationEvent::Queued { .. } => "queued",
            ConversationEvent::ResponseLinked { .. } => "linked",
            ConversationEvent::LlmError { .. } => "error",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "processing", // m1
            "queued",     // m2
            "queued",     // m3
            "linked",     // m1 -> resp_1
            "processing", // m2
            "linked",     // m2 -> resp_2
            "processing", // m3
            "linked",     // m3 -> resp_3
        ]
    );
}

#[tokio::test]
async fn inference_failure_does_not_block_the_queue() {
    let h = harness();
    let id = ConversationId::for_pair("alice", "luna");
    h.provider.push_failure("model overloaded").await;

    h.coordinator
        .handle_inbound(inbound("alice", "m1", "hello"))
        .await
        .unwrap();
    h.coordinator
        .handle_inbound(inbound("alice", "m2", "still there?"))
        .await
        .unwrap();

    let current = ChatMessage::user("m1", "hello", Utc::now());
    let err = h
        .coordinator
        .run_inference(&id, &[], &current)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("model overloaded"));

    let next = h.coordinator.fail(&id, "m1", "provider_error").await.unwrap();
    assert_eq!(next.unwrap().message_id, "m2");

    let events = h.sink.events_for(&id).await;
    assert!(events.iter().any(|e| matches!(
        e,
        ConversationEvent::LlmError { message_id, error_type, .. }
            if message_id == "m1" && error_type == "provider_error"
    )));

    // m2 proceeds normally.
    let reply = h
        .coordinator
        .run_inference(&id, &[], &ChatMessage::user("m2", "still there?", Utc::now()))
        .await
        .unwrap();
    assert_eq!(reply, "mock reply");
}

#[tokio::test]
async fn stuck_conversation_recovers_on_next_inbound() {
    let config = CoordinatorConfig::default();
    let store = Arc::new(MemoryStateStore::from_config(&config));
    let sink = RecordingSink::new();
    let coordinator = Coordinator::new(
        store.clone(),
        Arc::new(sink.clone()),
        Arc::new(MockInference::new()),
        &config,
    );
    let id = ConversationId::for_pair("alice", "luna");

    coordinator
        .handle_inbound(inbound("alice", "m1", "hello"))
        .await
        .unwrap();

    // Backdate the processing start past the stuck timeout.
    let snap = store.get(&id).await.unwrap();
    let mut state = snap.state;
    state.processing_started_at = Some(Utc::now() - chrono::Duration::seconds(150));
    store.set(&id, state).await.unwrap();

    let snap = store.get(&id).await.unwrap();
    assert!(snap.needs_reset);

    // The next message does not wait behind the lost one.
    let outcome = coordinator
        .handle_inbound(inbound("alice", "m2", "hello again"))
        .await
        .unwrap();
    assert!(matches!(outcome, IntakeOutcome::Processing));

    let snap = store.get(&id).await.unwrap();
    assert_eq!(snap.state.currently_processing.as_deref(), Some("m2"));
    assert!(!snap.needs_reset);
}

#[tokio::test]
async fn overflow_rejection_leaves_queue_intact() {
    let h = harness();
    let id = ConversationId::for_pair("alice", "luna");

    h.coordinator
        .handle_inbound(inbound("alice", "m0", "first"))
        .await
        .unwrap();
    for i in 1..=10 {
        h.coordinator
            .handle_inbound(inbound("alice", &format!("m{i}"), "more"))
            .await
            .unwrap();
    }

    let outcome = h
        .coordinator
        .handle_inbound(inbound("alice", "m11", "one too many"))
        .await
        .unwrap();
    let IntakeOutcome::Rejected { reason } = outcome else {
        panic!("expected rejection");
    };
    assert!(reason.contains("queue full"));

    let snap = h.store.get(&id).await.unwrap();
    assert_eq!(snap.state.message_queue.len(), 10);
    assert!(
        !snap
            .state
            .message_queue
            .iter()
            .any(|e| e.message_id == "m11")
    );
}

#[tokio::test]
async fn sweep_now_purges_stale_queue_entries() {
    let h = harness();
    let id = ConversationId::for_pair("alice", "luna");

    h.coordinator
        .handle_inbound(inbound("alice", "m1", "hello"))
        .await
        .unwrap();
    h.coordinator
        .handle_inbound(inbound("alice", "m2", "queued"))
        .await
        .unwrap();

    // Backdate the queued entry past the message TTL.
    let snap = h.store.get(&id).await.unwrap();
    let mut state = snap.state;
    state.message_queue[0].queued_at = Utc::now() - chrono::Duration::seconds(400);
    h.store.set(&id, state).await.unwrap();

    let stats = h.coordinator.sweep_now().await;
    assert_eq!(stats.expired_entries, 1);

    // Completion of m1 finds nothing left to advance to.
    let next = h.coordinator.complete(&id, "m1", "resp_1").await.unwrap();
    assert!(next.is_none());
    let snap = h.store.get(&id).await.unwrap();
    assert_eq!(snap.state.phase, ConversationPhase::Idle);
}

#[tokio::test]
async fn cleanup_task_starts_and_stops() {
    let h = harness();
    h.coordinator.start_cleanup().await;
    h.coordinator.start_cleanup().await;
    h.coordinator.stop_cleanup().await;
    h.coordinator.stop_cleanup().await;
}
