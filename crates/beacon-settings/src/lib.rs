//! # beacon-settings
//!
//! Layered configuration for the Beacon relay.
//!
//! Settings are resolved from three layers (in priority order):
//! 1. **Compiled defaults**: [`BeaconSettings::default()`]
//! 2. **Settings file**: `~/.beacon/settings.json` or an explicit path,
//!    deep-merged over the defaults
//! 3. **Environment variables**: `PORT` and `BEACON_*` overrides
//!
//! Command-line flags are applied on top by the binary.
//!
//! ```no_run
//! let settings = beacon_settings::load_settings().unwrap_or_default();
//! println!("listening on {}:{}", settings.server.host, settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings,
    load_settings_from_explicit_path, load_settings_from_path, read_settings_file, settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_under_home_dot_beacon() {
        let path = settings_path();
        assert!(path.ends_with(".beacon/settings.json"));
    }

    #[test]
    fn re_exports_work() {
        let settings = BeaconSettings::default();
        assert_eq!(settings.server.port, 3000);
        let merged = deep_merge(serde_json::json!({"x": 1}), serde_json::json!({"y": 2}));
        assert_eq!(merged, serde_json::json!({"x": 1, "y": 2}));
    }
}
