//! Persistence collaborator seam for the Handoff platform.
//!
//! The broker itself holds no durable state: the lifecycle of every help
//! request and every conversation transcript lives in an external JSON
//! document store. This crate defines the [`HelpDeskStore`] trait the
//! rest of the workspace programs against, plus two implementations:
//!
//! - [`RestHelpDeskStore`] — talks to a hosted realtime-database-style
//!   REST backend (`PUT`/`PATCH`/`GET` against
//!   `{base}/{collection}/{id}.json`).
//! - [`MemoryHelpDeskStore`] — an in-process fake for tests that also
//!   enforces the monotonic status lattice.
//!
//! All calls are best-effort from the broker's perspective: the status
//! synchronizer logs failures and never lets them delay or fail the
//! agent-facing response.

mod error;
mod memory;
mod rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use handoff_types::{ConversationMessage, ConversationSession, HelpRequest, HelpStatus};

pub use error::StoreError;
pub use memory::MemoryHelpDeskStore;
pub use rest::RestHelpDeskStore;

/// Operations the platform performs against the durable help-desk store.
#[async_trait]
pub trait HelpDeskStore: Send + Sync {
    /// Writes a new help-request document, keyed by its `request_id`.
    async fn create_help_request(&self, record: &HelpRequest) -> Result<(), StoreError>;

    /// Rewrites the status of an existing help request. `resolved_at`
    /// and `answer` are only written when provided (the resolved path).
    async fn update_help_request_status(
        &self,
        request_id: &str,
        status: HelpStatus,
        resolved_at: Option<DateTime<Utc>>,
        answer: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Reads a help request back, or `None` when no document exists.
    async fn get_help_request(&self, request_id: &str) -> Result<Option<HelpRequest>, StoreError>;

    /// Creates an empty conversation session document.
    async fn create_session(
        &self,
        session_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Appends a transcript turn and refreshes the session's `ended_at`.
    ///
    /// Fails with [`StoreError::MissingRecord`] when the session does
    /// not exist.
    async fn append_message(
        &self,
        session_id: &str,
        message: ConversationMessage,
    ) -> Result<(), StoreError>;

    /// Stamps the session's `ended_at`.
    async fn end_session(&self, session_id: &str, ended_at: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// Reads a conversation session back, or `None` when absent.
    async fn get_session(&self, session_id: &str)
        -> Result<Option<ConversationSession>, StoreError>;
}

#[cfg(test)]
mod tests;
