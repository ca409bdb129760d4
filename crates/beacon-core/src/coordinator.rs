//! Presence coordination: registry mutation plus the outbound events it
//! implies.
//!
//! [`PresenceCoordinator`] is a pure state machine. Each call applies one
//! inbound event to the registry and returns the [`Outbound`] messages the
//! caller must fan out:
//!
//! | Inbound | Registry | Outbound | Recipients |
//! |---------|----------|----------|------------|
//! | `user-join` | [`register_join`] | `active-users` | everyone, sender included |
//! | `send-location` | [`update_location`] | `receive-location` (joined senders only) | everyone, sender included |
//! | disconnect | [`remove`] | `user-disconnect` (joined connections only) | everyone except the leaver |
//!
//! Echoing to the sender lets clients treat their own marker exactly like a
//! peer's.
//!
//! [`register_join`]: PresenceRegistry::register_join
//! [`update_location`]: PresenceRegistry::update_location
//! [`remove`]: PresenceRegistry::remove

use tracing::{debug, info};

use crate::ids::ConnectionId;
use crate::protocol::{ClientEvent, LocationUpdate, ServerEvent};
use crate::registry::PresenceRegistry;

/// Which connections an outbound event goes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipients {
    /// Every connected client.
    Everyone,
    /// Every connected client except one.
    EveryoneExcept(ConnectionId),
}

impl Recipients {
    /// Whether `connection_id` is addressed.
    pub fn includes(&self, connection_id: &ConnectionId) -> bool {
        match self {
            Self::Everyone => true,
            Self::EveryoneExcept(excluded) => excluded != connection_id,
        }
    }
}

/// An event to deliver and its audience.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    /// Audience.
    pub recipients: Recipients,
    /// Event to send.
    pub event: ServerEvent,
}

impl Outbound {
    fn everyone(event: ServerEvent) -> Self {
        Self {
            recipients: Recipients::Everyone,
            event,
        }
    }
}

/// Owns the presence registry and turns inbound events into outbound ones.
#[derive(Debug, Default)]
pub struct PresenceCoordinator {
    registry: PresenceRegistry,
}

impl PresenceCoordinator {
    /// Create a coordinator with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a validated client event from `origin`.
    pub fn handle(&mut self, origin: &ConnectionId, event: ClientEvent) -> Vec<Outbound> {
        match event {
            ClientEvent::UserJoin(name) => {
                info!(client_id = %origin, username = %name, "user joined");
                let _ = self.registry.register_join(origin, name);
                vec![Outbound::everyone(ServerEvent::ActiveUsers(
                    self.registry.snapshot(),
                ))]
            }
            ClientEvent::SendLocation(location) => {
                let Some(record) = self.registry.update_location(origin, location) else {
                    debug!(client_id = %origin, "location from unjoined client ignored");
                    return Vec::new();
                };
                vec![Outbound::everyone(ServerEvent::ReceiveLocation(
                    LocationUpdate {
                        id: origin.clone(),
                        username: record.display_name.clone(),
                        latitude: location.latitude(),
                        longitude: location.longitude(),
                    },
                ))]
            }
        }
    }

    /// Apply the disconnect of `origin`.
    ///
    /// Only the first call for a joined connection produces a notice; later
    /// calls and calls for never-joined connections return nothing.
    pub fn disconnect(&mut self, origin: &ConnectionId) -> Vec<Outbound> {
        match self.registry.remove(origin) {
            Some(record) => {
                info!(client_id = %origin, username = %record.display_name, "user left");
                vec![Outbound {
                    recipients: Recipients::EveryoneExcept(origin.clone()),
                    event: ServerEvent::UserDisconnect(origin.clone()),
                }]
            }
            None => Vec::new(),
        }
    }

    /// Read access to the registry.
    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }
}
