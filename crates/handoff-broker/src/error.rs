//! Error types for the escalation core.

/// Errors surfaced by broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// No supervisor connection is registered at submit time. Returned
    /// synchronously so the agent can tell the caller no human is
    /// available without blocking its turn.
    #[error("no supervisor connected")]
    NoSupervisorConnected,

    /// A freshly generated query id collided with an in-flight one.
    /// Query ids are UUIDv4, so this indicates a broken invariant, not
    /// an expected runtime condition.
    #[error("duplicate query id: {0}")]
    DuplicateQueryId(String),
}
