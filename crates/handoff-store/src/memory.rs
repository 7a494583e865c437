//! In-memory help-desk store for tests.

use crate::{HelpDeskStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use handoff_types::{ConversationMessage, ConversationSession, HelpRequest, HelpStatus};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    help_requests: HashMap<String, HelpRequest>,
    sessions: HashMap<String, ConversationSession>,
}

/// A fake store that keeps documents in process memory.
///
/// Unlike the REST backend, which merges whatever it is told, this fake
/// enforces the status lattice (`Resolved` is terminal) so tests catch
/// illegal rewrites.
#[derive(Default)]
pub struct MemoryHelpDeskStore {
    inner: Mutex<Inner>,
}

impl MemoryHelpDeskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HelpDeskStore for MemoryHelpDeskStore {
    async fn create_help_request(&self, record: &HelpRequest) -> Result<(), StoreError> {
        // PUT semantics: replaces any existing document.
        self.inner
            .lock()
            .await
            .help_requests
            .insert(record.request_id.clone(), record.clone());
        Ok(())
    }

    async fn update_help_request_status(
        &self,
        request_id: &str,
        status: HelpStatus,
        resolved_at: Option<DateTime<Utc>>,
        answer: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .help_requests
            .get_mut(request_id)
            .ok_or_else(|| StoreError::MissingRecord(request_id.to_string()))?;

        if !record.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }

        record.status = status;
        if let Some(at) = resolved_at {
            record.resolved_at = Some(at);
        }
        if let Some(text) = answer {
            record.answer = Some(text.to_string());
        }
        Ok(())
    }

    async fn get_help_request(&self, request_id: &str) -> Result<Option<HelpRequest>, StoreError> {
        Ok(self.inner.lock().await.help_requests.get(request_id).cloned())
    }

    async fn create_session(
        &self,
        session_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.lock().await.sessions.insert(
            session_id.to_string(),
            ConversationSession::new(session_id, started_at),
        );
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: ConversationMessage,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::MissingRecord(session_id.to_string()))?;
        session.append(message);
        Ok(())
    }

    async fn end_session(
        &self,
        session_id: &str,
        ended_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::MissingRecord(session_id.to_string()))?;
        session.ended_at = Some(ended_at);
        Ok(())
    }

    async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationSession>, StoreError> {
        Ok(self.inner.lock().await.sessions.get(session_id).cloned())
    }
}
