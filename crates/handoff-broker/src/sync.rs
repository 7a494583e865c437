//! Translates broker lifecycle events into durable status rewrites.

use chrono::{DateTime, Utc};
use handoff_store::HelpDeskStore;
use handoff_types::HelpStatus;
use std::sync::Arc;

/// Best-effort bridge from broker outcomes to the help-desk store.
///
/// Every call dispatches a detached task: persistence is observability,
/// not a correctness dependency of the agent-facing response, so a slow
/// backend never delays the caller. Failures are logged and dropped;
/// there are no automatic retries.
#[derive(Clone)]
pub struct StatusSynchronizer {
    store: Arc<dyn HelpDeskStore>,
}

impl StatusSynchronizer {
    pub fn new(store: Arc<dyn HelpDeskStore>) -> Self {
        Self { store }
    }

    /// A supervisor answered: the record becomes `Resolved` (terminal)
    /// with the answer text and resolution timestamp.
    pub fn mark_resolved(&self, request_id: &str, answer: &str, resolved_at: DateTime<Utc>) {
        self.dispatch(
            request_id,
            HelpStatus::Resolved,
            Some(resolved_at),
            Some(answer.to_string()),
        );
    }

    /// Dispatch failed (no supervisor reachable): the agent keeps
    /// handling the caller itself.
    pub fn mark_in_progress(&self, request_id: &str) {
        self.dispatch(request_id, HelpStatus::InProgress, None, None);
    }

    /// The wait timed out: the record goes back to `Pending` — still
    /// open and eligible for re-escalation, not failed.
    pub fn mark_pending(&self, request_id: &str, timed_out_at: DateTime<Utc>) {
        tracing::debug!(
            request_id = %request_id,
            timed_out_at = %timed_out_at,
            "re-opening help request after unanswered escalation"
        );
        self.dispatch(request_id, HelpStatus::Pending, None, None);
    }

    fn dispatch(
        &self,
        request_id: &str,
        status: HelpStatus,
        resolved_at: Option<DateTime<Utc>>,
        answer: Option<String>,
    ) {
        let store = self.store.clone();
        let request_id = request_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = store
                .update_help_request_status(&request_id, status, resolved_at, answer.as_deref())
                .await
            {
                tracing::warn!(
                    request_id = %request_id,
                    status = %status,
                    "help desk status update failed: {}",
                    e
                );
            }
        });
    }
}
