use crate::models::{Coordinates, Stop};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// One visit in an optimized route, as exchanged with the optimizer service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStep {
    /// Index into the day's full appointment list
    pub appointment_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    /// `HH:MM`
    pub departure_time: String,
    /// `HH:MM`
    pub arrival_time: String,
    pub work_duration_minutes: u32,
    pub maps_url: String,
}

/// Visiting order and time estimate returned by a route optimizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizedRoute {
    /// Permutation of indices into the day's full appointment list
    pub order: Vec<usize>,
    pub total_estimated_minutes: u32,
    pub steps: Vec<RouteStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OptimizedRoute {
    pub fn empty(message: &str) -> Self {
        OptimizedRoute {
            order: Vec::new(),
            total_estimated_minutes: 0,
            steps: Vec::new(),
            message: Some(message.to_string()),
        }
    }
}

pub fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &index in order {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// Stops annotated by the time estimator, in visiting order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimedRoute {
    pub stops: Vec<Stop>,
    /// Travel plus work minutes over the whole route
    pub total_estimated_minutes: f64,
    /// Sum of the legs whose distance is known
    pub total_distance_km: f64,
}

impl TimedRoute {
    /// At least one leg had no distance data
    pub fn is_approximate(&self) -> bool {
        self.stops.iter().any(|s| s.approximate)
    }
}

/// Visible map area: a centre and the span in degrees on each axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MapRegion {
    pub center: Coordinates,
    pub lat_delta: f64,
    pub lng_delta: f64,
}

// Request types for API endpoints

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRouteRequest {
    pub farrier_id: Option<Uuid>,
    pub date: Option<String>,
}

impl OptimizeRouteRequest {
    pub fn validate(&self) -> Result<(Uuid, Date), String> {
        match (self.farrier_id, self.date.as_deref()) {
            (Some(farrier_id), Some(date)) => Ok((farrier_id, parse_route_date(date)?)),
            _ => Err("farrierId and date are required".to_string()),
        }
    }
}

/// Accepts a bare `YYYY-MM-DD` date or a full RFC 3339 timestamp, whose
/// calendar date is used.
pub fn parse_route_date(raw: &str) -> Result<Date, String> {
    let raw = raw.trim();
    if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Ok(date);
    }
    OffsetDateTime::parse(raw, &Rfc3339)
        .map(|ts| ts.date())
        .map_err(|_| format!("Invalid date: '{}' (expected YYYY-MM-DD)", raw))
}
