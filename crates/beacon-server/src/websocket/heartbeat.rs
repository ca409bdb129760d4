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

/// Watch a connection for activity.
///
/// Sleeps until `timeout` after the last inbound frame. If nothing arrived
/// in the meantime the loop ends with [`HeartbeatResult::TimedOut`];
/// otherwise it re-arms against the newer timestamp. The session's writer
/// pings every heartbeat interval, so a healthy client refreshes the
/// timestamp with its Pong as long as `timeout` exceeds that interval.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    loop {
        let deadline = connection.last_seen() + timeout;
        tokio::select! {
            () = time::sleep_until(deadline) => {
                if connection.last_seen_elapsed() >= timeout {
                    return HeartbeatResult::TimedOut;
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
    use beacon_core::ConnectionId;
    use tokio::sync::mpsc;

    fn make_connection() -> Arc<ClientConnection> {
        let (tx, _rx) = mpsc::channel(4);
        Arc::new(ClientConnection::new(ConnectionId::from("hb_conn"), tx))
    }

    #[tokio::test]
    async fn cancelled_before_timeout() {
        let conn = make_connection();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let handle = tokio::spawn(async move {
            run_heartbeat(conn, Duration::from_secs(300), cancel2).await
        });

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_client_times_out() {
        let conn = make_connection();
        let started = time::Instant::now();

        let result =
            run_heartbeat(conn, Duration::from_millis(300), CancellationToken::new()).await;

        assert_eq!(result, HeartbeatResult::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn active_client_stays_connected() {
        let conn = make_connection();
        let conn2 = conn.clone();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let handle = tokio::spawn(async move {
            run_heartbeat(conn2, Duration::from_millis(600), cancel2).await
        });

        for _ in 0..10 {
            time::sleep(Duration::from_millis(400)).await;
            conn.mark_alive();
        }

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn pongs_each_interval_keep_rearming() {
        // Pong every 200ms against a 300ms window.
        let conn = make_connection();
        let conn2 = conn.clone();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let handle = tokio::spawn(async move {
            run_heartbeat(conn2, Duration::from_millis(300), cancel2).await
        });

        time::sleep(Duration::from_millis(5)).await;
        conn.mark_alive();
        for _ in 0..8 {
            time::sleep(Duration::from_millis(200)).await;
            conn.mark_alive();
        }
        assert!(!handle.is_finished());

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn goes_silent_after_activity() {
        let conn = make_connection();
        let conn2 = conn.clone();
        let started = time::Instant::now();

        let handle = tokio::spawn(async move {
            run_heartbeat(conn2, Duration::from_millis(300), CancellationToken::new()).await
        });

        time::sleep(Duration::from_millis(250)).await;
        conn.mark_alive();

        assert_eq!(handle.await.unwrap(), HeartbeatResult::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(550));
    }
}
