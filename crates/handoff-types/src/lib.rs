//! Shared types and status definitions for the Handoff platform.
//!
//! This crate provides the foundational types used across all Handoff
//! crates: the help-request lifecycle status, the durable record shapes
//! owned by the persistence collaborator, and conversation transcript
//! types.
//!
//! No crate in the workspace depends on anything *except* `handoff-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a help request.
///
/// The status advances monotonically: `Pending → InProgress` (the agent
/// kept the call because no supervisor could take it) or
/// `Pending → Resolved` (a supervisor answered). `Resolved` is terminal.
/// A wait that times out writes `Pending` again — the request is still
/// open and eligible for re-escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HelpStatus {
    /// Awaiting a supervisor answer; eligible for (re-)escalation.
    Pending,
    /// No supervisor was reachable; the agent is handling the caller itself.
    InProgress,
    /// A supervisor answered. Terminal.
    Resolved,
}

impl HelpStatus {
    /// Returns the string label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
        }
    }

    /// Whether a record in this status may be rewritten to `next`.
    ///
    /// `Resolved` is terminal. Writing `Pending` over `Pending` or
    /// `InProgress` is allowed: the timeout path re-opens a request.
    pub fn can_transition_to(self, next: HelpStatus) -> bool {
        !matches!(self, Self::Resolved) || next == Self::Resolved
    }
}

impl std::fmt::Display for HelpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable help-request record, owned by the persistence collaborator.
///
/// The broker never reads this record back; it only writes status
/// transitions through the status synchronizer, correlated by
/// `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpRequest {
    /// Correlation token linking escalations to this record.
    pub request_id: String,
    /// The conversation session this request originated from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The question the agent could not answer.
    pub question: String,
    /// Current lifecycle status.
    pub status: HelpStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When a supervisor resolved the request, if it has been.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// The supervisor's answer, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl HelpRequest {
    /// Creates a new `Pending` record.
    pub fn new(
        request_id: impl Into<String>,
        session_id: Option<String>,
        question: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            session_id,
            question: question.into(),
            status: HelpStatus::Pending,
            created_at,
            resolved_at: None,
            answer: None,
        }
    }
}

/// One turn of a persisted conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who spoke: "user", "assistant", or "supervisor".
    pub role: String,
    /// The utterance text.
    pub content: String,
    /// When the turn happened.
    pub timestamp: DateTime<Utc>,
}

/// A persisted conversation session: an ordered transcript plus
/// start/end markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub messages: Vec<ConversationMessage>,
    pub started_at: DateTime<Utc>,
    /// Refreshed on every appended message; stamped once more when the
    /// session is explicitly ended.
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl ConversationSession {
    /// Creates an empty session started at `started_at`.
    pub fn new(session_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            started_at,
            ended_at: None,
        }
    }

    /// Appends a message and refreshes `ended_at` to the message time.
    pub fn append(&mut self, message: ConversationMessage) {
        self.ended_at = Some(message.timestamp);
        self.messages.push(message);
    }
}
