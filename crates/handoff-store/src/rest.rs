//! REST client for the hosted help-desk document store.
//!
//! The backend is a realtime-database-style JSON tree: every document is
//! addressable as `{base}/{collection}/{id}.json`, `PUT` replaces a
//! document, `PATCH` merges fields into it, and `GET` of a missing
//! document yields JSON `null`.

use crate::{HelpDeskStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use handoff_types::{ConversationMessage, ConversationSession, HelpRequest, HelpStatus};
use serde_json::json;
use std::time::Duration;

/// Timeout for a single store round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const HELP_REQUESTS: &str = "help_requests";
const CONVERSATIONS: &str = "conversations";

/// Help-desk store backed by a JSON document REST backend.
#[derive(Debug, Clone)]
pub struct RestHelpDeskStore {
    base_url: String,
    client: reqwest::Client,
}

impl RestHelpDeskStore {
    /// Creates a store client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Http` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { base_url, client })
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}.json", self.base_url, collection, id)
    }

    fn check(resp: &reqwest::Response, path: &str) -> Result<(), StoreError> {
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Status {
                status: resp.status().as_u16(),
                path: path.to_string(),
            })
        }
    }

    async fn put(&self, url: &str, body: &serde_json::Value) -> Result<(), StoreError> {
        let resp = self.client.put(url).json(body).send().await?;
        Self::check(&resp, url)
    }

    async fn patch(&self, url: &str, body: &serde_json::Value) -> Result<(), StoreError> {
        let resp = self.client.patch(url).json(body).send().await?;
        Self::check(&resp, url)
    }

    /// Fetches a document; a 404 or a JSON `null` body both mean absent.
    async fn get_doc(&self, url: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let resp = self.client.get(url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check(&resp, url)?;
        let value: serde_json::Value = resp.json().await?;
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

/// Builds the merge body for a status rewrite. `resolved_at` and
/// `answer` are only included when provided, so a timeout rewrite never
/// clears an earlier resolution timestamp by accident.
fn status_patch(
    status: HelpStatus,
    resolved_at: Option<DateTime<Utc>>,
    answer: Option<&str>,
) -> serde_json::Value {
    let mut patch = serde_json::Map::new();
    patch.insert("status".to_string(), json!(status));
    if let Some(at) = resolved_at {
        patch.insert("resolved_at".to_string(), json!(at));
    }
    if let Some(text) = answer {
        patch.insert("answer".to_string(), json!(text));
    }
    serde_json::Value::Object(patch)
}

#[async_trait]
impl HelpDeskStore for RestHelpDeskStore {
    async fn create_help_request(&self, record: &HelpRequest) -> Result<(), StoreError> {
        let url = self.doc_url(HELP_REQUESTS, &record.request_id);
        self.put(&url, &serde_json::to_value(record)?).await?;
        tracing::info!(request_id = %record.request_id, "created help request record");
        Ok(())
    }

    async fn update_help_request_status(
        &self,
        request_id: &str,
        status: HelpStatus,
        resolved_at: Option<DateTime<Utc>>,
        answer: Option<&str>,
    ) -> Result<(), StoreError> {
        let url = self.doc_url(HELP_REQUESTS, request_id);
        self.patch(&url, &status_patch(status, resolved_at, answer))
            .await?;
        tracing::info!(request_id = %request_id, status = %status, "updated help request status");
        Ok(())
    }

    async fn get_help_request(&self, request_id: &str) -> Result<Option<HelpRequest>, StoreError> {
        let url = self.doc_url(HELP_REQUESTS, request_id);
        match self.get_doc(&url).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn create_session(
        &self,
        session_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let url = self.doc_url(CONVERSATIONS, session_id);
        let session = ConversationSession::new(session_id, started_at);
        self.put(&url, &serde_json::to_value(&session)?).await?;
        tracing::info!(session_id = %session_id, "created conversation session");
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: ConversationMessage,
    ) -> Result<(), StoreError> {
        let url = self.doc_url(CONVERSATIONS, session_id);
        let value = self
            .get_doc(&url)
            .await?
            .ok_or_else(|| StoreError::MissingRecord(session_id.to_string()))?;
        let mut session: ConversationSession = serde_json::from_value(value)?;
        session.append(message);

        // Merge only the fields we changed; started_at stays untouched.
        self.patch(
            &url,
            &json!({
                "messages": session.messages,
                "ended_at": session.ended_at,
            }),
        )
        .await
    }

    async fn end_session(
        &self,
        session_id: &str,
        ended_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let url = self.doc_url(CONVERSATIONS, session_id);
        self.patch(&url, &json!({ "ended_at": ended_at })).await?;
        tracing::info!(session_id = %session_id, "ended conversation session");
        Ok(())
    }

    async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationSession>, StoreError> {
        let url = self.doc_url(CONVERSATIONS, session_id);
        match self.get_doc(&url).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
