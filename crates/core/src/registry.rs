//! Connection registry: the process-wide map from endpoint id to live
//! session.
//!
//! This is the single piece of shared in-memory state. Sessions are reachable
//! only through this interface; per-session write serialization comes from
//! each handle's single-consumer outbound queue, drained by the session's
//! writer task.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use peerlink_common::config::OverflowPolicy;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::RwLock;
use tracing::{debug, warn};

struct SessionHandle {
    conn_id: u64,
    tx: mpsc::Sender<String>,
    /// Advisory; the sender itself is the source of truth for writability.
    online: bool,
}

/// Registry of live sessions keyed by endpoint identifier.
#[derive(Clone)]
pub struct ConnectionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    next_conn_id: Arc<AtomicU64>,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
}

impl ConnectionRegistry {
    /// Create a registry whose session queues hold `queue_capacity` frames
    /// and overflow according to `overflow_policy`.
    #[must_use]
    pub fn new(queue_capacity: usize, overflow_policy: OverflowPolicy) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_conn_id: Arc::new(AtomicU64::new(1)),
            queue_capacity: queue_capacity.max(1),
            overflow_policy,
        }
    }

    /// Register a session for `id`, superseding any prior entry. Returns the
    /// connection token used for deregistration and the outbound frame
    /// queue. Dropping a superseded entry closes its queue, which ends the
    /// old session's writer.
    pub async fn register(&self, id: &str) -> (u64, mpsc::Receiver<String>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        let mut sessions = self.sessions.write().await;
        let handle = SessionHandle {
            conn_id,
            tx,
            online: true,
        };
        if sessions.insert(id.to_owned(), handle).is_some() {
            debug!(user = %id, "superseding prior session");
        }

        (conn_id, rx)
    }

    /// Remove the entry for `id` iff it still belongs to `conn_id`. A
    /// superseded session must not delete its successor.
    pub async fn deregister(&self, id: &str, conn_id: u64) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.get(id).is_some_and(|h| h.conn_id == conn_id) {
            sessions.remove(id);
            true
        } else {
            false
        }
    }

    /// Whether an endpoint currently has an online session.
    pub async fn is_online(&self, id: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(id)
            .is_some_and(|h| h.online)
    }

    /// All registered endpoints with their advisory online flag.
    pub async fn snapshot(&self) -> Vec<(String, bool)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), handle.online))
            .collect()
    }

    /// Serialize and enqueue a frame for `id`. Returns false when the
    /// recipient is absent, offline, or the write fails.
    pub async fn send<T: Serialize>(&self, id: &str, frame: &T) -> bool {
        self.send_raw(id, serde_json::to_string(frame).unwrap_or_default())
            .await
    }

    /// Enqueue an already-serialized frame for `id`.
    pub async fn send_raw(&self, id: &str, frame: String) -> bool {
        let outcome = {
            let sessions = self.sessions.read().await;
            let Some(handle) = sessions.get(id) else {
                return false;
            };
            if !handle.online {
                return false;
            }
            handle.tx.try_send(frame).map_err(|e| (handle.conn_id, e))
        };

        match outcome {
            Ok(()) => true,
            Err((_, TrySendError::Closed(_))) => {
                debug!(user = %id, "session queue closed");
                false
            }
            Err((conn_id, TrySendError::Full(_))) => {
                match self.overflow_policy {
                    OverflowPolicy::Drop => {
                        warn!(user = %id, "outbound queue full, dropping frame");
                    }
                    OverflowPolicy::Disconnect => {
                        warn!(user = %id, "outbound queue full, disconnecting session");
                        self.deregister(id, conn_id).await;
                    }
                }
                false
            }
        }
    }
}
