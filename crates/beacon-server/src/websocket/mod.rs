//! WebSocket connection handling.

pub mod broadcast;
pub mod connection;
pub mod heartbeat;
pub mod session;
