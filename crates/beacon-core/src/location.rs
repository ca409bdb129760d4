//! Geographic coordinates.

use serde::{Deserialize, Serialize};

use crate::errors::PresenceError;

/// Unvalidated coordinates exactly as they arrive on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

/// A validated latitude/longitude pair.
///
/// Both values are finite; latitude lies in `[-90, 90]` and longitude in
/// `[-180, 180]`. Deserialization runs the same check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Coordinates")]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Validate and build a location.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PresenceError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(PresenceError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(PresenceError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Degrees north.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Degrees east.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<Coordinates> for Location {
    type Error = PresenceError;

    fn try_from(raw: Coordinates) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn accepts_valid_coordinates() {
        let loc = Location::new(51.5, -0.12).unwrap();
        assert_eq!(loc.latitude(), 51.5);
        assert_eq!(loc.longitude(), -0.12);
    }

    #[test]
    fn accepts_boundaries() {
        assert!(Location::new(90.0, 180.0).is_ok());
        assert!(Location::new(-90.0, -180.0).is_ok());
        assert!(Location::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn rejects_latitude_out_of_range() {
        assert_matches!(
            Location::new(90.01, 0.0),
            Err(PresenceError::InvalidLatitude(_))
        );
        assert_matches!(
            Location::new(-91.0, 0.0),
            Err(PresenceError::InvalidLatitude(_))
        );
    }

    #[test]
    fn rejects_longitude_out_of_range() {
        assert_matches!(
            Location::new(0.0, 180.5),
            Err(PresenceError::InvalidLongitude(_))
        );
    }

    #[test]
    fn rejects_non_finite() {
        assert_matches!(
            Location::new(f64::NAN, 0.0),
            Err(PresenceError::InvalidLatitude(_))
        );
        assert_matches!(
            Location::new(0.0, f64::INFINITY),
            Err(PresenceError::InvalidLongitude(_))
        );
    }

    #[test]
    fn serializes_as_plain_object() {
        let loc = Location::new(10.0, 20.0).unwrap();
        let value = serde_json::to_value(loc).unwrap();
        assert_eq!(value, serde_json::json!({"latitude": 10.0, "longitude": 20.0}));
    }

    #[test]
    fn deserialize_validates_range() {
        let ok: Result<Location, _> =
            serde_json::from_str(r#"{"latitude": 1.0, "longitude": 2.0}"#);
        assert!(ok.is_ok());
        let bad: Result<Location, _> =
            serde_json::from_str(r#"{"latitude": 100.0, "longitude": 2.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn integer_coordinates_are_accepted() {
        let loc: Location = serde_json::from_str(r#"{"latitude": 10, "longitude": 20}"#).unwrap();
        assert_eq!(loc.latitude(), 10.0);
        assert_eq!(loc.longitude(), 20.0);
    }
}
