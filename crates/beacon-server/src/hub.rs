//! Presence hub: the single owner of presence state on the server.
//!
//! Every mutation takes the coordinator lock, applies the event, and queues
//! the resulting broadcasts before releasing it. Two joins racing each
//! other therefore produce rosters in a consistent order on every client.
//! Queuing is `try_send`, so holding the lock never waits on a socket.
//!
//! Lock order: coordinator, then the broadcast connection map.

use std::sync::Arc;

use beacon_core::{ClientEvent, ConnectionId, Outbound, PresenceCoordinator, UserSummary};
use metrics::{counter, gauge};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::metrics::{PRESENCE_EVENTS_TOTAL, PRESENCE_MALFORMED_TOTAL, PRESENCE_USERS_ACTIVE};
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::connection::ClientConnection;

/// Shared presence state plus the connections it fans out to.
pub struct PresenceHub {
    coordinator: Mutex<PresenceCoordinator>,
    broadcast: Arc<BroadcastManager>,
}

impl PresenceHub {
    /// Create a hub with no users and no connections.
    pub fn new() -> Self {
        Self {
            coordinator: Mutex::new(PresenceCoordinator::new()),
            broadcast: Arc::new(BroadcastManager::new()),
        }
    }

    /// Register a connection for fan-out, unless `limit` are already open.
    pub async fn attach(&self, connection: Arc<ClientConnection>, limit: usize) -> bool {
        self.broadcast.try_add(connection, limit).await
    }

    /// Parse and apply one inbound text frame.
    ///
    /// Malformed or out-of-range payloads are logged and counted; they
    /// never reach the registry and never close the connection.
    pub async fn dispatch_text(&self, origin: &ConnectionId, text: &str) {
        match ClientEvent::parse(text) {
            Ok(event) => self.dispatch(origin, event).await,
            Err(e) => {
                counter!(PRESENCE_MALFORMED_TOTAL, "kind" => e.kind()).increment(1);
                warn!(
                    client_id = %origin,
                    kind = e.kind(),
                    error = %e,
                    "dropping malformed message"
                );
            }
        }
    }

    /// Apply a validated event from `origin` and fan out the result.
    pub async fn dispatch(&self, origin: &ConnectionId, event: ClientEvent) {
        counter!(PRESENCE_EVENTS_TOTAL, "event" => event.name()).increment(1);
        debug!(client_id = %origin, event = event.name(), "dispatching");

        let mut coordinator = self.coordinator.lock().await;
        let outbound = coordinator.handle(origin, event);
        record_users(&coordinator);
        self.fan_out(&outbound).await;
    }

    /// Forget `origin`: drop it from fan-out and, if it had joined, tell
    /// everyone else. Safe to call more than once.
    pub async fn disconnect(&self, origin: &ConnectionId) {
        let mut coordinator = self.coordinator.lock().await;
        let _ = self.broadcast.remove(origin).await;
        let outbound = coordinator.disconnect(origin);
        record_users(&coordinator);
        self.fan_out(&outbound).await;
    }

    /// Current roster, ordered by connection id.
    pub async fn snapshot(&self) -> Vec<UserSummary> {
        self.coordinator.lock().await.registry().snapshot()
    }

    /// Number of joined users.
    pub async fn active_users(&self) -> usize {
        self.coordinator.lock().await.registry().len()
    }

    /// Number of open connections, joined or not.
    pub async fn connection_count(&self) -> usize {
        self.broadcast.connection_count().await
    }

    async fn fan_out(&self, outbound: &[Outbound]) {
        for message in outbound {
            let _ = self.broadcast.deliver(message).await;
        }
    }
}

impl Default for PresenceHub {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_users(coordinator: &PresenceCoordinator) {
    gauge!(PRESENCE_USERS_ACTIVE).set(coordinator.registry().len() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::Location;
    use beacon_core::logging::capture_logs;
    use serde_json::Value;
    use tokio::sync::mpsc;
    use tracing::Level;

    struct Client {
        id: ConnectionId,
        rx: mpsc::Receiver<Arc<String>>,
    }

    impl Client {
        fn next(&mut self) -> Option<Value> {
            self.rx
                .try_recv()
                .ok()
                .map(|text| serde_json::from_str(&text).unwrap())
        }
    }

    async fn connect(hub: &PresenceHub, id: &str) -> Client {
        let (tx, rx) = mpsc::channel(32);
        let id = ConnectionId::from(id);
        assert!(hub.attach(Arc::new(ClientConnection::new(id.clone(), tx)), 16).await);
        Client { id, rx }
    }

    #[tokio::test]
    async fn join_sends_roster_to_all() {
        let hub = PresenceHub::new();
        let mut alice = connect(&hub, "a").await;
        let mut bob = connect(&hub, "b").await;

        hub.dispatch_text(&alice.id, r#"{"event":"user-join","data":"Alice"}"#).await;

        let seen_by_alice = alice.next().unwrap();
        assert_eq!(seen_by_alice["event"], "active-users");
        assert_eq!(seen_by_alice["data"][0]["username"], "Alice");
        assert_eq!(bob.next().unwrap(), seen_by_alice);
        assert_eq!(hub.active_users().await, 1);
    }

    #[tokio::test]
    async fn location_echoes_to_sender() {
        let hub = PresenceHub::new();
        let mut alice = connect(&hub, "a").await;
        hub.dispatch_text(&alice.id, r#"{"event":"user-join","data":"Alice"}"#).await;
        let _ = alice.next();

        hub.dispatch_text(
            &alice.id,
            r#"{"event":"send-location","data":{"latitude":10,"longitude":20}}"#,
        )
        .await;

        let update = alice.next().unwrap();
        assert_eq!(update["event"], "receive-location");
        assert_eq!(update["data"]["id"], "a");
        assert_eq!(update["data"]["username"], "Alice");
        assert_eq!(update["data"]["latitude"], 10.0);
    }

    #[tokio::test]
    async fn malformed_message_is_logged_and_ignored() {
        let (logs, _guard) = capture_logs();
        let hub = PresenceHub::new();
        let mut alice = connect(&hub, "a").await;

        hub.dispatch_text(&alice.id, "not json").await;
        hub.dispatch_text(
            &alice.id,
            r#"{"event":"send-location","data":{"latitude":91,"longitude":0}}"#,
        )
        .await;

        assert!(alice.next().is_none());
        assert_eq!(hub.active_users().await, 0);
        assert_eq!(logs.count_at_level(Level::WARN), 2);
        let kinds: Vec<_> = logs
            .events()
            .iter()
            .filter_map(|e| e.field("kind").map(str::to_owned))
            .collect();
        assert_eq!(kinds, ["malformed", "invalid_latitude"]);
    }

    #[tokio::test]
    async fn malformed_location_keeps_previous_fix() {
        let hub = PresenceHub::new();
        let mut alice = connect(&hub, "a").await;
        hub.dispatch_text(&alice.id, r#"{"event":"user-join","data":"Alice"}"#).await;
        hub.dispatch_text(
            &alice.id,
            r#"{"event":"send-location","data":{"latitude":51.5,"longitude":-0.12}}"#,
        )
        .await;
        while alice.next().is_some() {}

        for bad in [
            r#"{"event":"send-location","data":{"latitude":"north","longitude":0}}"#,
            r#"{"event":"send-location","data":{"latitude":12}}"#,
            r#"{"event":"send-location","data":{"latitude":0,"longitude":181}}"#,
        ] {
            hub.dispatch_text(&alice.id, bad).await;
        }

        assert!(alice.next().is_none());
        let roster = hub.snapshot().await;
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].location, Some(Location::new(51.5, -0.12).unwrap()));
    }

    #[tokio::test]
    async fn disconnect_notifies_others_once() {
        let hub = PresenceHub::new();
        let mut alice = connect(&hub, "a").await;
        let mut bob = connect(&hub, "b").await;
        hub.dispatch(&alice.id, ClientEvent::UserJoin("Alice".into())).await;
        hub.dispatch(&bob.id, ClientEvent::UserJoin("Bob".into())).await;
        while alice.next().is_some() {}
        while bob.next().is_some() {}

        hub.disconnect(&bob.id).await;
        hub.disconnect(&bob.id).await;

        let notice = alice.next().unwrap();
        assert_eq!(notice["event"], "user-disconnect");
        assert_eq!(notice["data"], "b");
        assert!(alice.next().is_none());
        assert!(bob.next().is_none());
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(hub.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn unjoined_disconnect_is_silent() {
        let hub = PresenceHub::new();
        let mut alice = connect(&hub, "a").await;
        let lurker = connect(&hub, "l").await;

        hub.disconnect(&lurker.id).await;
        assert!(alice.next().is_none());
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn attach_refused_at_limit() {
        let hub = PresenceHub::new();
        let (tx, _rx) = mpsc::channel(1);
        let first = Arc::new(ClientConnection::new(ConnectionId::from("1"), tx.clone()));
        let second = Arc::new(ClientConnection::new(ConnectionId::from("2"), tx));
        assert!(hub.attach(first, 1).await);
        assert!(!hub.attach(second, 1).await);
    }
}
