//! Event fan-out to connected WebSocket clients.

use std::collections::HashMap;
use std::sync::Arc;

use beacon_core::{ConnectionId, Outbound, Recipients, ServerEvent};
use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// Every open connection, addressable by id.
///
/// Delivery is non-blocking: a client whose queue is full misses the
/// message and the drop is counted, but nobody else waits on it.
pub struct BroadcastManager {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl BroadcastManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection unless `limit` connections are already open.
    pub async fn try_add(&self, connection: Arc<ClientConnection>, limit: usize) -> bool {
        let mut conns = self.connections.write().await;
        if conns.len() >= limit {
            return false;
        }
        let _ = conns.insert(connection.id.clone(), connection);
        true
    }

    /// Remove a connection by id. Returns whether it was present.
    pub async fn remove(&self, connection_id: &ConnectionId) -> bool {
        self.connections.write().await.remove(connection_id).is_some()
    }

    /// Serialize `outbound.event` once and queue it for every addressed
    /// connection. Returns the number of successful deliveries.
    pub async fn deliver(&self, outbound: &Outbound) -> usize {
        let Some(json) = encode(&outbound.event) else {
            return 0;
        };
        let conns = self.connections.read().await;
        let mut delivered = 0;
        for conn in conns.values() {
            if !outbound.recipients.includes(&conn.id) {
                continue;
            }
            if conn.send(json.clone()) {
                delivered += 1;
            } else {
                counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                warn!(
                    client_id = %conn.id,
                    event = outbound.event.name(),
                    "client queue full or closed, message dropped"
                );
            }
        }
        debug!(
            event = outbound.event.name(),
            audience = audience(&outbound.recipients),
            delivered,
            "broadcast event"
        );
        delivered
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(event: &ServerEvent) -> Option<Arc<String>> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "failed to serialize event");
            None
        }
    }
}

fn audience(recipients: &Recipients) -> &'static str {
    match recipients {
        Recipients::Everyone => "everyone",
        Recipients::EveryoneExcept(_) => "everyone_except",
    }
}
