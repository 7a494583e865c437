//! Supervisor connection bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Tracks the currently connected supervisor sessions.
///
/// Each session is a bounded channel of serialized outbound frames; the
/// transport side (one task per WebSocket) drains it. Pure bookkeeping,
/// no escalation logic.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    /// Active sessions: session id -> outbound frame sender.
    sessions: Arc<RwLock<HashMap<Uuid, mpsc::Sender<String>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a supervisor session, making it eligible for broadcast.
    ///
    /// Idempotent per session id: re-registering replaces the previous
    /// sender, leaving a single membership.
    pub async fn register(&self, session_id: Uuid, sender: mpsc::Sender<String>) {
        let replaced = self
            .sessions
            .write()
            .await
            .insert(session_id, sender)
            .is_some();
        if replaced {
            tracing::info!(session_id = %session_id, "replaced existing supervisor session");
        }
    }

    /// Removes a session. Safe to call on an already-removed session.
    pub async fn unregister(&self, session_id: Uuid) {
        self.sessions.write().await.remove(&session_id);
    }

    /// Whether any supervisor is currently reachable.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Number of connected supervisor sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Sends a frame to every registered session.
    ///
    /// Snapshot-then-send: the session map is only locked to copy the
    /// current senders, so registration and removal proceed concurrently
    /// with delivery. A failed send (the client is gone, or too slow to
    /// drain its queue) never aborts delivery to the others; the failed
    /// session is unregistered afterwards.
    ///
    /// Returns the number of sessions the frame was handed to.
    pub async fn broadcast(&self, frame: String) -> usize {
        let snapshot: Vec<(Uuid, mpsc::Sender<String>)> = {
            let sessions = self.sessions.read().await;
            sessions.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (session_id, tx) in snapshot {
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        "dropping supervisor session after failed send: {}",
                        e
                    );
                    failed.push(session_id);
                }
            }
        }

        if !failed.is_empty() {
            let mut sessions = self.sessions.write().await;
            for session_id in failed {
                sessions.remove(&session_id);
            }
        }

        delivered
    }
}
