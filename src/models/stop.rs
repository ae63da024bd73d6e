use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Proposed,
    Accepted,
    Confirmed,
    InProgress,
    Completed,
    Declined,
    Cancelled,
}

impl AppointmentStatus {
    /// Statuses that take part in a day's active route
    pub const ROUTABLE: [AppointmentStatus; 2] =
        [AppointmentStatus::Confirmed, AppointmentStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Proposed => "proposed",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Declined => "declined",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_routable(&self) -> bool {
        Self::ROUTABLE.contains(self)
    }

    /// No further transition is expected from these
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Declined | AppointmentStatus::Cancelled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "proposed" => Ok(AppointmentStatus::Proposed),
            "accepted" => Ok(AppointmentStatus::Accepted),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "in_progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "declined" => Ok(AppointmentStatus::Declined),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(format!("Invalid appointment status: '{}'", s)),
        }
    }
}

/// One appointment to visit on a given day.
///
/// The trailing fields are derived by the time estimator and are never
/// written back to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub id: Uuid,
    pub customer_name: String,
    pub address: String,
    pub city: String,
    pub coordinates: Option<Coordinates>,
    pub phone: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub horse_count: u32,
    pub sequence_index: Option<i32>,
    pub status: AppointmentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_previous_km: Option<f64>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_arrival: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_departure: Option<OffsetDateTime>,
    /// Set when a leg into this stop had no distance data, so its
    /// arrival ignores travel time.
    #[serde(default)]
    pub approximate: bool,
}

impl Stop {
    pub fn new(
        id: Uuid,
        customer_name: String,
        coordinates: Option<Coordinates>,
        scheduled_at: OffsetDateTime,
        horse_count: u32,
    ) -> Self {
        Stop {
            id,
            customer_name,
            address: String::new(),
            city: String::new(),
            coordinates,
            phone: None,
            scheduled_at,
            horse_count,
            sequence_index: None,
            status: AppointmentStatus::Confirmed,
            distance_from_previous_km: None,
            estimated_arrival: None,
            estimated_departure: None,
            approximate: false,
        }
    }

    pub fn is_geocoded(&self) -> bool {
        self.coordinates.is_some()
    }

    /// `address, city` with empty parts left out
    pub fn full_address(&self) -> String {
        [self.address.trim(), self.city.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Drop the fields computed by the time estimator
    pub fn clear_estimates(&mut self) {
        self.distance_from_previous_km = None;
        self.estimated_arrival = None;
        self.estimated_departure = None;
        self.approximate = false;
    }
}

/// The farrier's home base, used as the anchor of a day's route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarrierProfile {
    pub id: Uuid,
    pub full_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub home: Option<Coordinates>,
}
