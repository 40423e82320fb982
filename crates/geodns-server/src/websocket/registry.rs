//! The set of open connections and fan-out to all of them.
//!
//! Membership changes take the write lock; broadcast takes the read lock and
//! only ever enqueues with `try_send`, so no lock is held across socket I/O.
//! Broadcast never removes members: a connection whose queue is closed is
//! cleaned up by its own session.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

use super::connection::{ClientConnection, ConnectionId};
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// Per-broadcast delivery counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections registered when the broadcast ran.
    pub recipients: usize,
    /// Messages enqueued.
    pub delivered: usize,
    /// Messages dropped (full or closed queue).
    pub dropped: usize,
}

/// Registry of open client connections.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
    send_queue_capacity: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry whose connections get queues of `send_queue_capacity`.
    pub fn new(send_queue_capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            send_queue_capacity: send_queue_capacity.max(1),
        }
    }

    /// Register a new connection and return it with its outbound receiver.
    pub async fn connect(&self) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(self.send_queue_capacity);
        let connection = Arc::new(ClientConnection::new(ConnectionId::new(), tx));
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id().clone(), connection.clone());
        debug!(conn_id = %connection.id(), total = conns.len(), "connection registered");
        (connection, rx)
    }

    /// Remove a connection and mark it closed.
    ///
    /// Returns `false` if the ID was not registered.
    pub async fn disconnect(&self, id: &ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(id);
        match removed {
            Some(connection) => {
                let _ = connection.mark_closed();
                debug!(conn_id = %id, "connection removed");
                true
            }
            None => false,
        }
    }

    /// Serialize `message` once and enqueue it to every open connection.
    pub async fn broadcast<T>(&self, message: &T) -> Result<BroadcastReport, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        let json: Arc<str> = Arc::from(serde_json::to_string(message)?);
        Ok(self.broadcast_text(json).await)
    }

    /// Enqueue an already-serialized frame to every open connection.
    pub async fn broadcast_text(&self, text: Arc<str>) -> BroadcastReport {
        let conns = self.connections.read().await;
        let mut report = BroadcastReport {
            recipients: conns.len(),
            ..BroadcastReport::default()
        };
        for conn in conns.values() {
            match conn.send(text.clone()) {
                Ok(()) => report.delivered += 1,
                Err(reason) => {
                    report.dropped += 1;
                    counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(
                        conn_id = %conn.id(),
                        reason = reason.as_str(),
                        dropped_total = conn.drop_count(),
                        "failed to enqueue broadcast"
                    );
                }
            }
        }
        debug!(
            recipients = report.recipients,
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast to all"
        );
        report
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether `id` is currently registered.
    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}
