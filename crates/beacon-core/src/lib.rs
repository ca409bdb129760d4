//! # beacon-core
//!
//! Presence state and broadcast rules for the Beacon location relay.
//!
//! - **Ids**: [`ConnectionId`], an opaque per-connection token
//! - **Coordinates**: [`Location`], range-checked latitude/longitude
//! - **Protocol**: [`ClientEvent`] / [`ServerEvent`] tagged wire envelopes
//! - **Registry**: [`PresenceRegistry`], one record per joined connection
//! - **Coordinator**: [`PresenceCoordinator`], registry mutation → outbound events
//! - **Logging**: subscriber setup and in-memory capture for tests
//!
//! Nothing here performs network I/O; `beacon-server` owns the transport
//! and the fan-out.

#![deny(unsafe_code)]

pub mod coordinator;
pub mod errors;
pub mod ids;
pub mod location;
pub mod logging;
pub mod protocol;
pub mod registry;

pub use coordinator::{Outbound, PresenceCoordinator, Recipients};
pub use errors::PresenceError;
pub use ids::ConnectionId;
pub use location::{Coordinates, Location};
pub use protocol::{ClientEvent, ConnectionInfo, LocationUpdate, ServerEvent, UserSummary};
pub use registry::{PresenceRecord, PresenceRegistry};
