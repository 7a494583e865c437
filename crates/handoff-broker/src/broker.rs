//! The escalation broker: agent-facing submits, supervisor replies, and
//! the fan-out between them.

use crate::error::BrokerError;
use crate::pending::{PendingQueryTable, WaitOutcome};
use crate::registry::ConnectionRegistry;
use crate::sync::StatusSynchronizer;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

/// Answer text returned to the agent when no supervisor replies in time.
pub const NO_RESPONSE_ANSWER: &str = "No supervisor response within 120s.";

/// Default deadline for a supervisor to answer an escalated query.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(120);

/// An escalation submitted by the agent.
///
/// Extra fields beyond the two named ones are captured verbatim and pass
/// through into the broadcast envelope, so the agent can attach caller
/// context the supervisor console knows how to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuery {
    /// The question the agent could not answer.
    pub question: String,
    /// Correlation token for the durable help-request record.
    pub request_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// How a submit concluded. `TimedOut` is a normal outcome, not an error:
/// the agent renders it as a degraded answer and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A supervisor answered before the deadline.
    Answered {
        response: String,
        request_id: String,
    },
    /// Nobody answered within the reply timeout.
    TimedOut,
}

/// Inbound frame from a supervisor connection. Fields are optional so a
/// malformed-but-parseable frame is rejected by validation, not by serde.
#[derive(Debug, Deserialize)]
struct SupervisorReply {
    query_id: Option<String>,
    request_id: Option<String>,
    response: Option<String>,
}

/// Orchestrates one escalation topic between many concurrent agent
/// submits and many supervisor connections.
pub struct EscalationBroker {
    registry: ConnectionRegistry,
    pending: PendingQueryTable,
    sync: StatusSynchronizer,
    reply_timeout: Duration,
}

impl EscalationBroker {
    pub fn new(
        registry: ConnectionRegistry,
        sync: StatusSynchronizer,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            pending: PendingQueryTable::new(),
            sync,
            reply_timeout,
        }
    }

    /// The registry this broker fans out through. The transport layer
    /// registers and unregisters supervisor sessions here.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Escalates a question to all connected supervisors and suspends
    /// the calling task until the first valid answer or the deadline.
    ///
    /// # Errors
    ///
    /// [`BrokerError::NoSupervisorConnected`] when the registry is empty
    /// — returned immediately, without creating a pending entry, so the
    /// agent can tell the caller no human is available.
    pub async fn submit(&self, query: SubmitQuery) -> Result<SubmitOutcome, BrokerError> {
        if self.registry.is_empty().await {
            tracing::info!(
                request_id = %query.request_id,
                "escalation rejected: no supervisor connected"
            );
            self.sync.mark_in_progress(&query.request_id);
            return Err(BrokerError::NoSupervisorConnected);
        }

        let query_id = Uuid::new_v4().to_string();
        let ticket = self.pending.create(&query_id, &query.request_id).await?;

        let envelope = help_request_envelope(&query_id, &query);
        let delivered = self.registry.broadcast(envelope.to_string()).await;
        tracing::info!(
            query_id = %query_id,
            request_id = %query.request_id,
            delivered,
            "escalated help request to supervisors"
        );

        match self.pending.wait(ticket, self.reply_timeout).await {
            WaitOutcome::Settled(answer) => Ok(SubmitOutcome::Answered {
                response: answer.response,
                request_id: answer.request_id,
            }),
            WaitOutcome::TimedOut => {
                tracing::warn!(
                    query_id = %query_id,
                    request_id = %query.request_id,
                    "no supervisor response before deadline"
                );
                self.sync.mark_pending(&query.request_id, Utc::now());
                Ok(SubmitOutcome::TimedOut)
            }
        }
    }

    /// Handles one raw text frame from a supervisor connection.
    ///
    /// Runs concurrently with submits and with other connections'
    /// frames. Never returns an error to the supervisor: malformed,
    /// blank, late, and duplicate replies are all dropped with a log
    /// entry, keeping the connection task alive.
    pub async fn handle_supervisor_reply(&self, raw: &str) {
        let reply: SupervisorReply = match serde_json::from_str(raw) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("dropping malformed supervisor frame: {}", e);
                return;
            }
        };

        let Some(query_id) = reply.query_id.as_deref() else {
            tracing::warn!("dropping supervisor frame without query_id");
            return;
        };

        // A blank acknowledgment must never settle a pending query.
        let response = reply.response.as_deref().unwrap_or("");
        if response.trim().is_empty() {
            tracing::debug!(query_id = %query_id, "ignoring blank supervisor reply");
            return;
        }

        match self
            .pending
            .settle(query_id, response, reply.request_id.as_deref())
            .await
        {
            Some(answer) => {
                tracing::info!(
                    query_id = %query_id,
                    request_id = %answer.request_id,
                    "supervisor resolved help request"
                );
                self.sync
                    .mark_resolved(&answer.request_id, &answer.response, Utc::now());

                // Tell every supervisor, including the one who answered,
                // so nobody keeps working this question.
                let notice = json!({
                    "type": "help_resolved",
                    "request_id": answer.request_id,
                    "query_id": query_id,
                    "response": answer.response,
                });
                self.registry.broadcast(notice.to_string()).await;
            }
            None => {
                // Late reply after timeout, or a second supervisor
                // answering an already-settled query.
                tracing::debug!(
                    query_id = %query_id,
                    "ignoring reply for unknown or already-settled query"
                );
            }
        }
    }

    /// Number of in-flight queries (one per outstanding submit).
    pub async fn in_flight(&self) -> usize {
        self.pending.len().await
    }
}

/// Builds the broadcast envelope for a help request. Extra submission
/// fields pass through; the reserved `type` and `query_id` keys always
/// come from the broker.
fn help_request_envelope(query_id: &str, query: &SubmitQuery) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    for (key, value) in &query.extra {
        fields.insert(key.clone(), value.clone());
    }
    fields.insert("type".to_string(), json!("help_request"));
    fields.insert("query_id".to_string(), json!(query_id));
    fields.insert("question".to_string(), json!(query.question));
    fields.insert("request_id".to_string(), json!(query.request_id));
    serde_json::Value::Object(fields)
}
