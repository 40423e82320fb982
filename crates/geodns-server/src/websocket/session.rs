//! WebSocket session lifecycle: handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use geodns_core::OutboundMessage;
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::handler::{MessageOutcome, handle_message};
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use super::registry::ConnectionRegistry;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};

/// How long the writer gets to flush a Close frame at teardown.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-session timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// Interval between server-initiated Ping frames.
    pub ping_interval: Duration,
    /// Close the connection after this long without any inbound frame.
    pub heartbeat_timeout: Duration,
}

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a Close frame.
    ClientClosed,
    /// The inbound stream ended without a Close frame.
    StreamEnded,
    /// Reading from the socket failed.
    TransportError,
    /// The outbound writer stopped (write failure).
    WriterExited,
    /// No activity within the heartbeat timeout.
    HeartbeatTimeout,
    /// The server is shutting down.
    Shutdown,
}

impl CloseReason {
    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::StreamEnded => "stream_ended",
            Self::TransportError => "transport_error",
            Self::WriterExited => "writer_exited",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the connection
/// 2. Forwards queued broadcasts to the socket and sends periodic Pings
/// 3. Handles inbound frames in order, broadcasting each routing decision
///    to every registered connection
/// 4. On close, error, writer exit, heartbeat timeout or shutdown,
///    unregisters the connection
#[instrument(skip_all, fields(conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    registry: Arc<ConnectionRegistry>,
    options: SessionOptions,
    shutdown: CancellationToken,
) {
    let (connection, send_rx) = registry.connect().await;
    let conn_id = connection.id().clone();
    let _ = tracing::Span::current().record("conn_id", conn_id.as_str());

    let connection_start = Instant::now();
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let (ws_tx, mut ws_rx) = ws.split();

    let writer_stop = CancellationToken::new();
    let mut outbound = tokio::spawn(forward_outbound(
        ws_tx,
        send_rx,
        options.ping_interval,
        writer_stop.clone(),
    ));
    let mut writer_done = false;

    let heartbeat = run_heartbeat(
        connection.clone(),
        options.ping_interval,
        options.heartbeat_timeout,
        shutdown.child_token(),
    );
    tokio::pin!(heartbeat);

    let reason = loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(msg)) => {
                    connection.mark_alive();
                    if let Some(reason) = handle_frame(msg, &registry).await {
                        break reason;
                    }
                }
                Some(Err(error)) => {
                    debug!(%error, "websocket read error");
                    break CloseReason::TransportError;
                }
                None => break CloseReason::StreamEnded,
            },
            _ = &mut outbound => {
                writer_done = true;
                break CloseReason::WriterExited;
            }
            result = &mut heartbeat => {
                break match result {
                    HeartbeatResult::TimedOut => {
                        warn!(
                            silent_for = ?connection.last_pong_elapsed(),
                            "client unresponsive, disconnecting"
                        );
                        CloseReason::HeartbeatTimeout
                    }
                    HeartbeatResult::Cancelled => CloseReason::Shutdown,
                };
            }
            () = shutdown.cancelled() => break CloseReason::Shutdown,
        }
    };

    // Clean up
    let removed = registry.disconnect(&conn_id).await;
    writer_stop.cancel();
    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut outbound).await.is_err() {
        outbound.abort();
    }

    info!(
        reason = reason.as_str(),
        removed,
        dropped = connection.drop_count(),
        age = ?connection.age(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection_start.elapsed().as_secs_f64());
}

/// Process one inbound frame. Returns a reason when the session must end.
async fn handle_frame(msg: Message, registry: &ConnectionRegistry) -> Option<CloseReason> {
    match msg {
        Message::Text(text) => dispatch(text.as_str(), registry).await,
        Message::Binary(data) => match std::str::from_utf8(&data) {
            Ok(text) => dispatch(text, registry).await,
            Err(_) => debug!(len = data.len(), "ignoring non-UTF8 binary frame"),
        },
        Message::Close(frame) => {
            debug!(?frame, "client sent close frame");
            return Some(CloseReason::ClientClosed);
        }
        Message::Ping(_) | Message::Pong(_) => {}
    }
    None
}

async fn dispatch(text: &str, registry: &ConnectionRegistry) {
    let MessageOutcome::Routed(decision) = handle_message(text) else {
        return;
    };
    match registry
        .broadcast(&OutboundMessage::RoutingDecision(decision))
        .await
    {
        Ok(report) if report.dropped > 0 => {
            warn!(
                delivered = report.delivered,
                dropped = report.dropped,
                "routing decision not delivered to every client"
            );
        }
        Ok(_) => {}
        Err(error) => warn!(%error, "failed to serialize routing decision"),
    }
}

/// Drain the outbound queue into the socket and send periodic Pings.
///
/// Returns when the socket rejects a write, the queue closes, or `stop`
/// fires (after a best-effort Close frame).
async fn forward_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut send_rx: mpsc::Receiver<Arc<str>>,
    ping_interval: Duration,
    stop: CancellationToken,
) {
    let mut ping = tokio::time::interval(ping_interval);
    // Skip the immediate first tick
    let _ = ping.tick().await;

    loop {
        tokio::select! {
            msg = send_rx.recv() => {
                let Some(text) = msg else { break };
                if let Err(error) = ws_tx.send(Message::Text(String::from(&*text).into())).await {
                    debug!(%error, "websocket write failed");
                    break;
                }
            }
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
            () = stop.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }
}
