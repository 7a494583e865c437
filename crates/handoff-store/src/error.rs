//! Error types for the help-desk store.

use handoff_types::HelpStatus;

/// Errors that can occur talking to the durable help-desk store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("help desk http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("help desk returned status {status} for {path}")]
    Status { status: u16, path: String },

    /// The referenced document does not exist.
    #[error("record not found: {0}")]
    MissingRecord(String),

    /// The requested status rewrite would regress a terminal record.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: HelpStatus, to: HelpStatus },

    /// JSON encoding or decoding of a document failed.
    #[error("help desk serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
