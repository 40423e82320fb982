//! Heartbeat liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped responding within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Number of consecutive silent intervals tolerated before timing out.
pub fn max_missed(interval: Duration, timeout: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    let missed = (timeout.as_millis() / interval_ms).max(1);
    u32::try_from(missed).unwrap_or(u32::MAX)
}

/// Watch a connection's liveness.
///
/// At each `interval` tick the alive flag is checked and reset. A tick with
/// no activity since the previous one counts as a miss; `max_missed`
/// consecutive misses end the loop with [`HeartbeatResult::TimedOut`].
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut check_interval = time::interval(interval);
    check_interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    let max_missed = max_missed(interval, timeout);
    let mut missed_pongs: u32 = 0;

    loop {
        tokio::select! {
            _ = check_interval.tick() => {
                if connection.check_alive() {
                    missed_pongs = 0;
                } else {
                    missed_pongs += 1;
                    if missed_pongs >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::ConnectionId;
    use tokio::sync::mpsc;

    fn make_connection() -> Arc<ClientConnection> {
        let (tx, _rx) = mpsc::channel(4);
        Arc::new(ClientConnection::new(ConnectionId::new(), tx))
    }

    #[test]
    fn max_missed_from_ratio() {
        assert_eq!(max_missed(Duration::from_millis(100), Duration::from_millis(300)), 3);
        assert_eq!(max_missed(Duration::from_secs(30), Duration::from_secs(90)), 3);
        assert_eq!(max_missed(Duration::from_secs(30), Duration::from_secs(10)), 1);
        assert_eq!(max_missed(Duration::ZERO, Duration::from_millis(5)), 5);
    }

    #[tokio::test]
    async fn heartbeat_cancelled() {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(
            make_connection(),
            Duration::from_secs(100),
            Duration::from_secs(300),
            cancel.clone(),
        ));
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_connection_times_out() {
        let conn = make_connection();
        // consume the initial alive flag
        let _ = conn.check_alive();
        let result = run_heartbeat(
            conn,
            Duration::from_millis(100),
            Duration::from_millis(300),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, HeartbeatResult::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn active_connection_stays_alive() {
        let conn = make_connection();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(
            conn.clone(),
            Duration::from_millis(100),
            Duration::from_millis(200),
            cancel.clone(),
        ));

        for _ in 0..20 {
            time::sleep(Duration::from_millis(50)).await;
            conn.mark_alive();
        }

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_resets_missed_count() {
        let conn = make_connection();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(
            conn.clone(),
            Duration::from_millis(100),
            Duration::from_millis(300),
            cancel.clone(),
        ));

        // two silent intervals, then activity, then two more silent ones
        time::sleep(Duration::from_millis(250)).await;
        conn.mark_alive();
        time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }
}
