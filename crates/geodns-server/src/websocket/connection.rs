//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Unique connection identifier (`conn_<uuid v7>`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh, time-ordered ID.
    pub fn new() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a connection. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered and accepting outbound messages.
    Open,
    /// Removed from the registry; sends fail.
    Closed,
}

/// Why an enqueue did not happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendFailure {
    /// The outbound queue is at capacity (slow consumer).
    QueueFull,
    /// The connection is closed or its writer has gone away.
    Closed,
}

impl SendFailure {
    /// Short label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
        }
    }
}

/// Represents a connected WebSocket client.
pub struct ClientConnection {
    id: ConnectionId,
    /// Send channel to the client's WebSocket write task.
    tx: mpsc::Sender<Arc<str>>,
    /// When this connection was established.
    connected_at: Instant,
    open: AtomicBool,
    /// Whether the client has shown activity since the last heartbeat check.
    is_alive: AtomicBool,
    /// When the last frame (of any kind) was received.
    last_pong: Mutex<Instant>,
    /// Count of messages not enqueued.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new open connection.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<str>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            open: AtomicBool::new(true),
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Connection ID.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        if self.open.load(Ordering::Acquire) {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    /// Transition to `Closed`. Returns `false` if already closed.
    pub fn mark_closed(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }

    /// Enqueue a text frame without waiting.
    ///
    /// On failure the dropped-message counter is incremented.
    pub fn send(&self, message: Arc<str>) -> Result<(), SendFailure> {
        let result = if self.state() == ConnectionState::Closed {
            Err(SendFailure::Closed)
        } else {
            self.tx.try_send(message).map_err(|e| match e {
                TrySendError::Full(_) => SendFailure::QueueFull,
                TrySendError::Closed(_) => SendFailure::Closed,
            })
        };
        if result.is_err() {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record client activity (any inbound frame, pongs included).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last inbound activity (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the client was active since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("dropped_messages", &self.drop_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientConnection::new(ConnectionId::new(), tx), rx)
    }

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert!(a.as_str().starts_with("conn_"));
        assert_eq!(a.to_string(), a.as_str());
        assert_ne!(a, b);
    }

    #[test]
    fn new_connection_is_open_and_alive() {
        let (conn, _rx) = make_connection(4);
        assert_eq!(conn.state(), ConnectionState::Open);
        assert!(conn.check_alive());
        assert_eq!(conn.drop_count(), 0);
    }

    #[tokio::test]
    async fn send_message_success() {
        let (conn, mut rx) = make_connection(4);
        assert_eq!(conn.send(Arc::from("hello")), Ok(()));
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_to_full_queue_is_dropped() {
        let (conn, _rx) = make_connection(1);
        assert_eq!(conn.send(Arc::from("msg1")), Ok(()));
        assert_eq!(conn.send(Arc::from("msg2")), Err(SendFailure::QueueFull));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_is_closed() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert_eq!(conn.send(Arc::from("hello")), Err(SendFailure::Closed));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_after_mark_closed_fails() {
        let (conn, mut rx) = make_connection(4);
        assert!(conn.mark_closed());
        assert!(!conn.mark_closed());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.send(Arc::from("late")), Err(SendFailure::Closed));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn check_alive_resets_flag() {
        let (conn, _rx) = make_connection(4);
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn mark_alive_resets_last_pong() {
        let (conn, _rx) = make_connection(4);
        std::thread::sleep(Duration::from_millis(20));
        assert!(conn.last_pong_elapsed() >= Duration::from_millis(20));
        conn.mark_alive();
        assert!(conn.last_pong_elapsed() < Duration::from_millis(20));
    }

    #[test]
    fn connection_age_increases() {
        let (conn, _rx) = make_connection(4);
        let age1 = conn.age();
        std::thread::sleep(Duration::from_millis(10));
        assert!(conn.age() > age1);
    }

    #[tokio::test]
    async fn messages_arrive_in_order() {
        let (conn, mut rx) = make_connection(8);
        for i in 0..5 {
            conn.send(Arc::from(format!("msg_{i}"))).unwrap();
        }
        for i in 0..5 {
            assert_eq!(&*rx.recv().await.unwrap(), format!("msg_{i}"));
        }
    }

    #[test]
    fn send_failure_labels() {
        assert_eq!(SendFailure::QueueFull.as_str(), "queue_full");
        assert_eq!(SendFailure::Closed.as_str(), "closed");
    }
}
