//! Geographic point and store location types.
//!
//! Locations are serialized GeoJSON-style, longitude first:
//!
//! ```json
//! { "type": "Point", "coordinates": [-79.8, 43.2], "address": "1 Main St" }
//! ```

use serde::{Deserialize, Serialize};

/// Search radius for nearby stores, in metres.
pub const NEAR_MAX_DISTANCE_METERS: f64 = 10_000.0;

/// Maximum number of stores returned by a proximity search.
pub const NEAR_LIMIT: i64 = 10;

/// Equatorial earth radius in metres, used for haversine distances.
pub const EARTH_RADIUS_METERS: f64 = 6_378_100.0;

/// Errors that can occur when building a [`GeoPoint`] or [`Location`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Longitude outside -180..=180.
    #[error("longitude must be between -180 and 180 (got {0})")]
    LongitudeOutOfRange(f64),
    /// Latitude outside -90..=90.
    #[error("latitude must be between -90 and 90 (got {0})")]
    LatitudeOutOfRange(f64),
    /// A coordinate could not be parsed as a number.
    #[error("coordinates must be numbers")]
    NotANumber,
    /// The address is empty.
    #[error("you must supply an address")]
    MissingAddress,
}

/// A longitude/latitude pair in degrees (WGS 84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    lng: f64,
    lat: f64,
}

impl GeoPoint {
    /// Create a point from longitude and latitude.
    ///
    /// # Errors
    ///
    /// Returns an error if either coordinate is out of range or not finite.
    pub fn new(lng: f64, lat: f64) -> Result<Self, GeoError> {
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        Ok(Self { lng, lat })
    }

    /// Parse a point from form or query string values.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::NotANumber` if either value is not a number, or a
    /// range error from [`GeoPoint::new`].
    pub fn parse(lng: &str, lat: &str) -> Result<Self, GeoError> {
        let lng = lng.trim().parse::<f64>().map_err(|_| GeoError::NotANumber)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| GeoError::NotANumber)?;
        Self::new(lng, lat)
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }
}

impl TryFrom<[f64; 2]> for GeoPoint {
    type Error = GeoError;

    fn try_from([lng, lat]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(lng, lat)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lng, point.lat]
    }
}

/// The geometry type tag of a [`Location`].
///
/// Store locations are always single points, never regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointKind {
    #[default]
    Point,
}

impl PointKind {
    /// The literal stored in the database and sent to clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
        }
    }
}

/// A store's location: a point plus a free-text address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: PointKind,
    pub coordinates: GeoPoint,
    pub address: String,
}

impl Location {
    /// Create a location, trimming the address.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::MissingAddress` if the address is blank.
    pub fn new(coordinates: GeoPoint, address: &str) -> Result<Self, GeoError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeoError::MissingAddress);
        }
        Ok(Self {
            kind: PointKind::Point,
            coordinates,
            address: address.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_ranges() {
        assert!(GeoPoint::new(-79.8, 43.2).is_ok());
        assert!(GeoPoint::new(180.0, -90.0).is_ok());
        assert!(matches!(
            GeoPoint::new(181.0, 0.0),
            Err(GeoError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            GeoPoint::new(0.0, 90.5),
            Err(GeoError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            GeoPoint::new(f64::NAN, 0.0),
            Err(GeoError::LongitudeOutOfRange(_))
        ));
    }

    #[test]
    fn test_parse_query_values() {
        let point = GeoPoint::parse("-79.8", " 43.2").unwrap();
        assert!((point.lng() - -79.8).abs() < f64::EPSILON);
        assert!((point.lat() - 43.2).abs() < f64::EPSILON);
        assert_eq!(GeoPoint::parse("west", "43.2"), Err(GeoError::NotANumber));
    }

    #[test]
    fn test_location_serializes_longitude_first() {
        let location = Location::new(GeoPoint::new(-79.8, 43.2).unwrap(), " 1 Main St ").unwrap();
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Point",
                "coordinates": [-79.8, 43.2],
                "address": "1 Main St"
            })
        );
    }

    #[test]
    fn test_location_rejects_non_point_type() {
        let json = r#"{"type":"Polygon","coordinates":[0.0,0.0],"address":"x"}"#;
        assert!(serde_json::from_str::<Location>(json).is_err());
    }

    #[test]
    fn test_location_requires_address() {
        let point = GeoPoint::new(0.0, 0.0).unwrap();
        assert_eq!(Location::new(point, "   "), Err(GeoError::MissingAddress));
    }
}
