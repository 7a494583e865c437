//! The pending-query table: one single-assignment result slot per
//! in-flight escalation.

use crate::error::BrokerError;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};

/// The answer assigned to a settled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorAnswer {
    /// The supervisor's response text.
    pub response: String,
    /// Correlation token for the durable help-request record.
    pub request_id: String,
}

struct Entry {
    /// `request_id` captured at submission; used when the reply omits one.
    request_id: String,
    slot: oneshot::Sender<SupervisorAnswer>,
}

/// The receiving half of one pending query's result slot. Consumed by
/// [`PendingQueryTable::wait`].
#[derive(Debug)]
pub struct PendingQueryTicket {
    query_id: String,
    rx: oneshot::Receiver<SupervisorAnswer>,
}

/// How a wait on a pending query concluded.
#[derive(Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A supervisor settled the query before the deadline.
    Settled(SupervisorAnswer),
    /// The deadline elapsed; the entry has been evicted.
    TimedOut,
}

/// Maps in-flight query ids to their result slots.
///
/// Map occupancy equals the number of truly in-flight queries: every
/// entry is removed exactly once, by whichever of settle and
/// timeout-eviction wins the race. Removal happens under the table lock
/// and a winning settle sends into the slot before releasing it, so the
/// losing side can always tell what happened: the entry is gone, and for
/// a racing waiter the answer is already in its slot.
///
/// Lock discipline: all acquisitions are brief map operations that never
/// span an `.await` on foreign futures.
#[derive(Default)]
pub struct PendingQueryTable {
    entries: Mutex<HashMap<String, Entry>>,
}

impl PendingQueryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the result slot for a new query.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DuplicateQueryId`] when the id is already
    /// in flight — an internal invariant violation given UUID ids.
    pub async fn create(
        &self,
        query_id: &str,
        request_id: &str,
    ) -> Result<PendingQueryTicket, BrokerError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(query_id) {
            return Err(BrokerError::DuplicateQueryId(query_id.to_string()));
        }

        let (slot, rx) = oneshot::channel();
        entries.insert(
            query_id.to_string(),
            Entry {
                request_id: request_id.to_string(),
                slot,
            },
        );
        Ok(PendingQueryTicket {
            query_id: query_id.to_string(),
            rx,
        })
    }

    /// Assigns the result for `query_id`, first writer wins.
    ///
    /// Returns the settled answer, or `None` when the query is unknown —
    /// already settled, timed out, or never created. Callers treat
    /// `None` as an ignorable late/duplicate message, not an error.
    ///
    /// When the reply carried no `request_id`, the one captured at
    /// submission fills in, so the answer always carries the correlation
    /// token.
    pub async fn settle(
        &self,
        query_id: &str,
        response: &str,
        reply_request_id: Option<&str>,
    ) -> Option<SupervisorAnswer> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(query_id)?;

        let answer = SupervisorAnswer {
            response: response.to_string(),
            request_id: reply_request_id.unwrap_or(&entry.request_id).to_string(),
        };

        // Send while still holding the lock: a waiter whose deadline
        // fired concurrently and finds the entry gone is then guaranteed
        // to find the answer in its slot.
        if entry.slot.send(answer.clone()).is_err() {
            tracing::debug!(query_id = %query_id, "settled query had no waiter");
        }
        Some(answer)
    }

    /// Suspends the calling task until the query settles or `timeout`
    /// elapses. Only this caller is suspended; other queries and other
    /// supervisors' messages proceed concurrently.
    ///
    /// The table entry is gone by the time this returns, whichever way
    /// the wait concluded.
    pub async fn wait(&self, ticket: PendingQueryTicket, timeout: Duration) -> WaitOutcome {
        let PendingQueryTicket { query_id, mut rx } = ticket;

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(answer)) => WaitOutcome::Settled(answer),
            Ok(Err(_)) => {
                // Slot sender dropped without settling; only possible if
                // the table itself is being torn down. Evict and report
                // a timeout.
                self.entries.lock().await.remove(&query_id);
                WaitOutcome::TimedOut
            }
            Err(_elapsed) => {
                let evicted = self.entries.lock().await.remove(&query_id).is_some();
                if evicted {
                    WaitOutcome::TimedOut
                } else {
                    // A settle won the race at the deadline and has
                    // already removed the entry; drain the slot.
                    match rx.try_recv() {
                        Ok(answer) => WaitOutcome::Settled(answer),
                        Err(_) => WaitOutcome::TimedOut,
                    }
                }
            }
        }
    }

    /// Number of in-flight queries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
