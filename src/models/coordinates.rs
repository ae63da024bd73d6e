use crate::constants::EARTH_RADIUS_KM;
use serde::{Deserialize, Serialize};

/// Great-circle distance in kilometres between two points given in degrees,
/// using the haversine formula.
///
/// Symmetric, and `0.0` for identical points. Inputs are not validated:
/// a NaN coordinate yields NaN, so callers check coordinates at their own
/// boundary (see [`Coordinates::new`]).
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                lat
            ));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                lng
            ));
        }
        Ok(Coordinates { lat, lng })
    }

    /// Build coordinates from a pair of nullable columns.
    /// Returns `None` unless both halves are present and in range.
    pub fn from_optional(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng).ok(),
            _ => None,
        }
    }

    /// Haversine distance in kilometres
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_km(self.lat, self.lng, other.lat, other.lng)
    }

    /// `lat,lng` as used in map deep links
    pub fn as_query_value(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}
