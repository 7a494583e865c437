//! Human-in-the-loop escalation core for the Handoff platform.
//!
//! An automated agent handling a live customer conversation can hand a
//! question it cannot answer to a pool of connected human supervisors:
//! [`EscalationBroker::submit`] fans the question out to every
//! supervisor, suspends the calling task until the first valid answer
//! arrives or a deadline elapses, and returns the outcome. A winning
//! answer also triggers a `help_resolved` notice to all supervisors so
//! nobody keeps working an already-answered question.
//!
//! The crate is transport-agnostic: supervisor connections are bounded
//! channels of serialized frames owned by the [`ConnectionRegistry`];
//! the server crate wires them to WebSockets. Durable state transitions
//! go through the [`StatusSynchronizer`] as detached best-effort tasks.
//!
//! All broker state is ephemeral and lost on restart; durable records
//! live in the external help-desk store.

mod broker;
mod error;
mod pending;
mod registry;
mod sync;

pub use broker::{
    EscalationBroker, SubmitOutcome, SubmitQuery, DEFAULT_REPLY_TIMEOUT, NO_RESPONSE_ANSWER,
};
pub use error::BrokerError;
pub use pending::{PendingQueryTable, PendingQueryTicket, SupervisorAnswer, WaitOutcome};
pub use registry::ConnectionRegistry;
pub use sync::StatusSynchronizer;
