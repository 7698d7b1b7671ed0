use goftar::backends::{LlmBackend, MockBackend};
use goftar::context_management::{
    CompactionConfig, CompactionStrategy, ContextStrategy, TokenCounter, TruncationStrategy,
};
use goftar::conversations::{
    ConversationError, ConversationMessage, ConversationSession, MessageSummarizer, Role,
};
use std::sync::Arc;

fn truncating_session(backend: Arc<MockBackend>) -> ConversationSession {
    ConversationSession::new(backend, Box::new(TruncationStrategy::default()))
}

#[tokio::test]
async fn test_full_turn_appends_input_and_reply() {
    let backend = Arc::new(MockBackend::new().with_reply("Hello! How can I help?", 25));
    let mut session = truncating_session(Arc::clone(&backend));

    let reply = session.send("hi, how are you?").await.unwrap();

    assert_eq!(reply, "Hello! How can I help?");
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_every_valid_role_commits_exactly_one_turn_before_network() {
    for role in [Role::System, Role::User, Role::Assistant] {
        // Force the backend call to fail so only the input append is left.
        let backend = Arc::new(MockBackend::new().failing("unreachable"));
        let mut session = truncating_session(Arc::clone(&backend));

        let result = session.send_as("turn", role).await;

        assert!(result.is_err());
        assert_eq!(session.history().len(), 1, "role {:?}", role);
        assert_eq!(session.history()[0].role, role);
        assert_eq!(backend.seen_contexts().len(), 1);
    }
}

#[tokio::test]
async fn test_invalid_role_string_leaves_history_untouched() {
    let backend = Arc::new(MockBackend::new());
    let mut session = truncating_session(Arc::clone(&backend));
    session.send("first turn").await.unwrap();
    let before = session.history().len();

    // Role parsing fails before the session is ever involved.
    let parsed = "moderator".parse::<Role>();

    match parsed {
        Err(ConversationError::InvalidRole { role }) => assert_eq!(role, "moderator"),
        other => panic!("expected InvalidRole, got {:?}", other),
    }
    assert_eq!(session.history().len(), before);
}

#[tokio::test]
async fn test_long_conversation_sends_only_last_four() {
    let backend = Arc::new(MockBackend::new());
    let mut session = truncating_session(Arc::clone(&backend));

    for i in 0..6 {
        session.send(&format!("user turn {}", i)).await.unwrap();
    }

    // 6 user turns + 6 replies in history, but each window capped at 4.
    assert_eq!(session.history().len(), 12);
    for window in backend.seen_contexts().iter().skip(2) {
        assert_eq!(window.len(), 4);
    }

    let contexts = backend.seen_contexts();
    let last = contexts.last().unwrap();
    // Original order, unchanged content.
    assert_eq!(last[3].content, "user turn 5");
    assert_eq!(last[2].content, "Mock reply to: user turn 4");
}

#[tokio::test]
async fn test_reply_round_trips_into_the_next_window() {
    let backend = Arc::new(MockBackend::new().with_reply("scripted reply", 12));
    let mut session = truncating_session(Arc::clone(&backend));

    session.send("one").await.unwrap();
    session.send("two").await.unwrap();

    let contexts = backend.seen_contexts();
    let second_window = &contexts[1];
    assert_eq!(second_window.len(), 3);
    assert!(second_window.iter().any(|m| m.content == "scripted reply"));
}

#[tokio::test]
async fn test_overrun_reported_by_backend_discards_reply() {
    let backend = Arc::new(
        MockBackend::new()
            .with_reply("fits fine", 100)
            .with_reply("does not fit", 4097),
    );
    let mut session = truncating_session(Arc::clone(&backend));

    session.send("short prompt").await.unwrap();
    let err = session.send("long prompt").await.unwrap_err();

    assert!(matches!(
        err,
        ConversationError::ContextWindowExceeded {
            used: 4097,
            limit: 4096
        }
    ));
    // First exchange committed; second input left unpaired.
    assert_eq!(session.history().len(), 3);
    assert_eq!(session.history()[2].role, Role::User);
    assert_eq!(session.history()[2].content, "long prompt");
}

#[tokio::test]
async fn test_compacting_session_replaces_old_turns_with_summary() {
    let backend = Arc::new(
        MockBackend::new()
            .with_one_shot_reply(r#"{"summary": [{"role": "assistant", "content": "Earlier small talk."}]}"#)
            .with_reply("understood", 30),
    );
    let strategy = CompactionStrategy::new(
        CompactionConfig {
            compaction_threshold: 1,
            preserve_recent: 2,
        },
        TokenCounter::new().unwrap(),
        MessageSummarizer::new(Arc::clone(&backend) as Arc<dyn LlmBackend>),
    );
    let mut session = ConversationSession::new(Arc::clone(&backend) as Arc<dyn LlmBackend>, Box::new(strategy));

    // Seed enough history that the strategy has something to fold away.
    session.send_as("hello", Role::User).await.unwrap();
    session.send("are you there?").await.unwrap();

    let contexts = backend.seen_contexts();
    let last = contexts.last().unwrap();
    assert_eq!(last[0].role, Role::System);
    assert!(last[0].content.contains("Earlier small talk."));
    // The most recent exchange survives verbatim at the tail.
    assert_eq!(last.last().unwrap().content, "are you there?");
}

#[tokio::test]
async fn test_malformed_summary_aborts_the_turn() {
    let backend = Arc::new(MockBackend::new().with_one_shot_reply("no json here"));
    let strategy = CompactionStrategy::new(
        CompactionConfig {
            compaction_threshold: 1,
            preserve_recent: 2,
        },
        TokenCounter::new().unwrap(),
        MessageSummarizer::new(Arc::clone(&backend) as Arc<dyn LlmBackend>),
    );
    let mut session = ConversationSession::new(Arc::clone(&backend) as Arc<dyn LlmBackend>, Box::new(strategy));

    session.send("one").await.unwrap();
    // The second turn pushes the history past preserve_recent, compaction
    // kicks in and fails on the malformed reply.
    let err = session.send("two").await.unwrap_err();

    assert!(matches!(err, ConversationError::MalformedSummary { .. }));
}

#[tokio::test]
async fn test_strategy_select_does_not_mutate_history() {
    let strategy = TruncationStrategy::default();
    let history: Vec<ConversationMessage> = (0..7)
        .map(|i| ConversationMessage::new(Role::User, format!("m{}", i)))
        .collect();
    let before = history.clone();

    let _window = strategy.select(&history).await.unwrap();

    assert_eq!(history, before);
}
