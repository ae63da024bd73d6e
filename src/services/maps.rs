//! Google Maps driving deep links.

use crate::constants::GOOGLE_MAPS_DIRECTIONS_URL;
use crate::models::Coordinates;

/// Directions from the device's position to `destination`.
pub fn destination_url(destination: &Coordinates) -> String {
    format!(
        "{}?api=1&destination={}&travelmode=driving",
        GOOGLE_MAPS_DIRECTIONS_URL,
        destination.as_query_value()
    )
}

/// Directions to a free-text address, for stops that are not geocoded.
/// Returns `None` for a blank address.
pub fn address_url(address: &str) -> Option<String> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    Some(format!(
        "{}?api=1&destination={}&travelmode=driving",
        GOOGLE_MAPS_DIRECTIONS_URL,
        urlencoding::encode(address)
    ))
}

/// Directions through every point of `stops`, in order. The last point is
/// the destination and the others become `|`-separated waypoints.
/// Returns `None` for an empty list.
pub fn route_url(origin: Option<&Coordinates>, stops: &[Coordinates]) -> Option<String> {
    let (destination, waypoints) = stops.split_last()?;

    let mut url = format!("{}?api=1", GOOGLE_MAPS_DIRECTIONS_URL);
    if let Some(origin) = origin {
        url.push_str(&format!("&origin={}", origin.as_query_value()));
    }
    url.push_str(&format!("&destination={}", destination.as_query_value()));
    if !waypoints.is_empty() {
        let joined = waypoints
            .iter()
            .map(Coordinates::as_query_value)
            .collect::<Vec<_>>()
            .join("|");
        url.push_str(&format!("&waypoints={}", urlencoding::encode(&joined)));
    }
    url.push_str("&travelmode=driving");
    Some(url)
}
