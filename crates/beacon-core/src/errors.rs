//! Presence error types.

use thiserror::Error;

/// Errors raised while validating an inbound client message.
///
/// None of these ever reach the registry: the connection handler logs the
/// error and drops the offending message.
#[derive(Debug, Error)]
pub enum PresenceError {
    /// The frame was not a well-formed envelope for a known event.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Latitude was not finite or outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    /// Longitude was not finite or outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
}

impl PresenceError {
    /// Short machine-readable label, used as a log field and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::InvalidLatitude(_) => "invalid_latitude",
            Self::InvalidLongitude(_) => "invalid_longitude",
        }
    }
}

/// Result type for presence operations.
pub type Result<T> = std::result::Result<T, PresenceError>;
