//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file may be partial: missing fields keep their compiled default.

mod server;

pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the Beacon relay.
///
/// Example file:
///
/// ```json
/// {
///   "server": { "port": 8080, "maxConnections": 1000 },
///   "logging": { "level": "debug", "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeaconSettings {
    /// Network and connection settings.
    pub server: ServerSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl BeaconSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        let s = &self.server;
        if s.max_connections == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "server.maxConnections must be at least 1".into(),
            ));
        }
        if s.heartbeat_interval_ms == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "server.heartbeatIntervalMs must be positive".into(),
            ));
        }
        // A Pong can only answer a Ping sent one interval in.
        if s.heartbeat_timeout_ms <= s.heartbeat_interval_ms {
            return Err(crate::SettingsError::InvalidValue(format!(
                "server.heartbeatTimeoutMs ({}) must exceed heartbeatIntervalMs ({})",
                s.heartbeat_timeout_ms, s.heartbeat_interval_ms
            )));
        }
        if s.max_message_size < 64 {
            return Err(crate::SettingsError::InvalidValue(format!(
                "server.maxMessageSize ({}) is too small",
                s.max_message_size
            )));
        }
        Ok(())
    }
}
