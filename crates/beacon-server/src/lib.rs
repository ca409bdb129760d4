//! # beacon-server
//!
//! HTTP and WebSocket transport for the Beacon location relay.
//!
//! - [`server::BeaconServer`] builds the Axum router and owns the listener
//! - [`hub::PresenceHub`] serializes presence mutations and fans out events
//! - [`websocket`] holds per-connection state, fan-out and the session loop
//!
//! Presence rules live in `beacon-core`; this crate only moves bytes.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use error::ServerError;
pub use hub::PresenceHub;
pub use server::BeaconServer;
