//! Wire protocol.
//!
//! Every frame is a JSON envelope `{"event": <name>, "data": <payload>}`.
//!
//! | Event | Direction | Payload |
//! |-------|-----------|---------|
//! | `user-join` | client → server | display name string |
//! | `send-location` | client → server | `{latitude, longitude}` |
//! | `connection-established` | server → client | `{id, timestamp}` |
//! | `active-users` | server → all | `[{id, username, location \| null}]` |
//! | `receive-location` | server → all | `{id, username, latitude, longitude}` |
//! | `user-disconnect` | server → all | connection id string |
//!
//! Inbound frames are decoded by [`ClientEvent::parse`], which validates
//! coordinates before anything touches the registry.

use serde::{Deserialize, Serialize};

use crate::errors::PresenceError;
use crate::ids::ConnectionId;
use crate::location::{Coordinates, Location};

/// A validated message from a client.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// `user-join`: the client announces its display name.
    UserJoin(String),
    /// `send-location`: the client reports its position.
    SendLocation(Location),
}

/// Envelope as decoded from the wire, before coordinate validation.
#[derive(Deserialize)]
#[serde(tag = "event", content = "data")]
enum RawClientEvent {
    #[serde(rename = "user-join")]
    UserJoin(String),
    #[serde(rename = "send-location")]
    SendLocation(Coordinates),
}

impl ClientEvent {
    /// Decode and validate a text frame.
    pub fn parse(text: &str) -> Result<Self, PresenceError> {
        match serde_json::from_str::<RawClientEvent>(text)? {
            RawClientEvent::UserJoin(name) => Ok(Self::UserJoin(name)),
            RawClientEvent::SendLocation(raw) => Ok(Self::SendLocation(Location::try_from(raw)?)),
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserJoin(_) => "user-join",
            Self::SendLocation(_) => "send-location",
        }
    }
}

/// One entry of the `active-users` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Connection the user is attached to.
    pub id: ConnectionId,
    /// Display name given at join.
    pub username: String,
    /// Last reported position, `null` until the first report.
    pub location: Option<Location>,
}

/// Payload of `receive-location`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    /// Connection that moved.
    pub id: ConnectionId,
    /// Its display name.
    pub username: String,
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

/// Payload of `connection-established`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Id assigned to the receiving connection.
    pub id: ConnectionId,
    /// RFC 3339 server time at accept.
    pub timestamp: String,
}

/// A message sent by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Sent once to a freshly accepted connection so it learns its own id.
    #[serde(rename = "connection-established")]
    ConnectionEstablished(ConnectionInfo),
    /// Full roster, sent after every join.
    #[serde(rename = "active-users")]
    ActiveUsers(Vec<UserSummary>),
    /// A joined user reported a new position.
    #[serde(rename = "receive-location")]
    ReceiveLocation(LocationUpdate),
    /// A joined user went away.
    #[serde(rename = "user-disconnect")]
    UserDisconnect(ConnectionId),
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished(_) => "connection-established",
            Self::ActiveUsers(_) => "active-users",
            Self::ReceiveLocation(_) => "receive-location",
            Self::UserDisconnect(_) => "user-disconnect",
        }
    }
}
