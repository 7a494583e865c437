//! Unit tests for the in-memory help-desk store.

use crate::{HelpDeskStore, MemoryHelpDeskStore, StoreError};
use chrono::Utc;
use handoff_types::{ConversationMessage, HelpRequest, HelpStatus};

fn pending_record(request_id: &str) -> HelpRequest {
    HelpRequest::new(request_id, None, "what does a hydra facial cost?", Utc::now())
}

// ── help request lifecycle ───────────────────────────────────────────

#[tokio::test]
async fn create_then_get_round_trips() {
    let store = MemoryHelpDeskStore::new();
    let record = pending_record("r1");
    store.create_help_request(&record).await.unwrap();

    let fetched = store.get_help_request("r1").await.unwrap().unwrap();
    assert_eq!(fetched, record);
    assert!(store.get_help_request("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn resolve_writes_answer_and_timestamp() {
    let store = MemoryHelpDeskStore::new();
    store.create_help_request(&pending_record("r1")).await.unwrap();

    let at = Utc::now();
    store
        .update_help_request_status("r1", HelpStatus::Resolved, Some(at), Some("It's $100"))
        .await
        .unwrap();

    let record = store.get_help_request("r1").await.unwrap().unwrap();
    assert_eq!(record.status, HelpStatus::Resolved);
    assert_eq!(record.resolved_at, Some(at));
    assert_eq!(record.answer.as_deref(), Some("It's $100"));
}

#[tokio::test]
async fn resolved_record_rejects_reopening() {
    let store = MemoryHelpDeskStore::new();
    store.create_help_request(&pending_record("r1")).await.unwrap();
    store
        .update_help_request_status("r1", HelpStatus::Resolved, Some(Utc::now()), Some("done"))
        .await
        .unwrap();

    let err = store
        .update_help_request_status("r1", HelpStatus::Pending, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn timeout_rewrite_keeps_request_pending() {
    let store = MemoryHelpDeskStore::new();
    store.create_help_request(&pending_record("r1")).await.unwrap();

    // The timeout path writes Pending over Pending; the record stays open.
    store
        .update_help_request_status("r1", HelpStatus::Pending, None, None)
        .await
        .unwrap();
    let record = store.get_help_request("r1").await.unwrap().unwrap();
    assert_eq!(record.status, HelpStatus::Pending);
    assert!(record.answer.is_none());
}

#[tokio::test]
async fn update_of_unknown_request_is_missing_record() {
    let store = MemoryHelpDeskStore::new();
    let err = store
        .update_help_request_status("ghost", HelpStatus::Resolved, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingRecord(_)));
}

// ── conversation sessions ────────────────────────────────────────────

#[tokio::test]
async fn append_refreshes_ended_at_and_orders_messages() {
    let store = MemoryHelpDeskStore::new();
    let started = Utc::now();
    store.create_session("sess-1", started).await.unwrap();

    for (i, content) in ["hi", "hello, this is July"].iter().enumerate() {
        store
            .append_message(
                "sess-1",
                ConversationMessage {
                    role: if i == 0 { "user" } else { "assistant" }.to_string(),
                    content: content.to_string(),
                    timestamp: started + chrono::Duration::seconds(i as i64 + 1),
                },
            )
            .await
            .unwrap();
    }

    let session = store.get_session("sess-1").await.unwrap().unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[0].content, "hi");
    assert_eq!(
        session.ended_at,
        Some(started + chrono::Duration::seconds(2))
    );
}

#[tokio::test]
async fn append_to_missing_session_errors() {
    let store = MemoryHelpDeskStore::new();
    let err = store
        .append_message(
            "ghost",
            ConversationMessage {
                role: "user".to_string(),
                content: "anyone there?".to_string(),
                timestamp: Utc::now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingRecord(_)));
}

#[tokio::test]
async fn end_session_stamps_ended_at() {
    let store = MemoryHelpDeskStore::new();
    let started = Utc::now();
    store.create_session("sess-1", started).await.unwrap();

    let ended = started + chrono::Duration::minutes(3);
    store.end_session("sess-1", ended).await.unwrap();

    let session = store.get_session("sess-1").await.unwrap().unwrap();
    assert_eq!(session.ended_at, Some(ended));
}
