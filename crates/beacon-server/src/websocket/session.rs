//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use beacon_core::{ConnectionId, ConnectionInfo, ServerEvent};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::config::ServerConfig;
use crate::hub::PresenceHub;
use crate::metrics::{
    PRESENCE_MALFORMED_TOTAL, WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE,
    WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL, WS_REJECTED_CONNECTIONS_TOTAL,
};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Close frame, stream end, or transport error.
    ClientClosed,
    /// No frames within the heartbeat timeout.
    HeartbeatTimeout,
    /// The server is shutting down.
    Shutdown,
}

impl SessionEnd {
    fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Queues `connection-established` and registers with the hub
/// 2. Spawns a writer that drains the send queue and emits Ping frames
/// 3. Feeds inbound text (and UTF-8 binary) frames to the hub
/// 4. Ends on close, heartbeat timeout, or shutdown
/// 5. Deregisters and lets the hub announce the departure
#[instrument(skip_all, fields(client_id = %connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: ConnectionId,
    hub: Arc<PresenceHub>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.send_queue_capacity.max(1));
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), send_tx));

    // Queued before attach so it precedes any broadcast on this channel.
    let hello = ServerEvent::ConnectionEstablished(ConnectionInfo {
        id: connection_id.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    });
    match serde_json::to_string(&hello) {
        Ok(json) => {
            let _ = connection.send(Arc::new(json));
        }
        Err(e) => warn!(error = %e, "failed to serialize connection-established"),
    }

    if !hub.attach(connection.clone(), config.max_connections).await {
        counter!(WS_REJECTED_CONNECTIONS_TOTAL).increment(1);
        warn!(
            limit = config.max_connections,
            "connection limit reached after upgrade, closing"
        );
        let _ = ws_tx
            .send(Message::Close(Some(CloseFrame {
                code: close_code::AGAIN,
                reason: "server full".into(),
            })))
            .await;
        return;
    }

    let connection_start = Instant::now();
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let ping_every = config.heartbeat_interval;
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(ping_every.max(Duration::from_millis(1)));
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let reader = async {
        while let Some(frame) = ws_rx.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(error = %e, "websocket read error");
                    break;
                }
            };
            connection.mark_alive();
            match msg {
                Message::Text(text) => hub.dispatch_text(&connection_id, text.as_str()).await,
                Message::Binary(data) => match std::str::from_utf8(&data) {
                    Ok(text) => hub.dispatch_text(&connection_id, text).await,
                    Err(_) => {
                        counter!(PRESENCE_MALFORMED_TOTAL, "kind" => "binary").increment(1);
                        warn!(len = data.len(), "dropping non-UTF-8 binary frame");
                    }
                },
                Message::Close(_) => {
                    debug!("client sent close frame");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    };

    let heartbeat = run_heartbeat(
        connection.clone(),
        config.heartbeat_timeout,
        shutdown.clone(),
    );
    let end = tokio::select! {
        () = reader => SessionEnd::ClientClosed,
        result = heartbeat => match result {
            HeartbeatResult::TimedOut => {
                let silent = connection.last_seen_elapsed();
                let silent_ms = u64::try_from(silent.as_millis()).unwrap_or(u64::MAX);
                warn!(silent_ms, "client unresponsive, disconnecting");
                SessionEnd::HeartbeatTimeout
            }
            HeartbeatResult::Cancelled => SessionEnd::Shutdown,
        },
    };

    outbound.abort();
    hub.disconnect(&connection_id).await;

    info!(reason = end.as_str(), dropped = connection.drop_count(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection_start.elapsed().as_secs_f64());
}
