use crate::config::RouteConfig;
use crate::models::{Stop, TimedRoute};
use time::{Duration, OffsetDateTime};

/// Linear time model: a fixed work time per horse plus a constant number of
/// travel minutes per straight-line kilometre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeModel {
    pub work_minutes_per_horse: u32,
    pub travel_minutes_per_km: f64,
}

impl Default for TimeModel {
    fn default() -> Self {
        TimeModel::from(&RouteConfig::default())
    }
}

impl From<&RouteConfig> for TimeModel {
    fn from(config: &RouteConfig) -> Self {
        TimeModel {
            work_minutes_per_horse: config.work_minutes_per_horse,
            travel_minutes_per_km: config.travel_minutes_per_km,
        }
    }
}

impl TimeModel {
    pub fn work_minutes(&self, horse_count: u32) -> i64 {
        i64::from(horse_count) * i64::from(self.work_minutes_per_horse)
    }

    pub fn travel_minutes(&self, distance_km: f64) -> f64 {
        distance_km * self.travel_minutes_per_km
    }
}

/// Fill in distance, arrival and departure for stops already in visiting
/// order, starting the first visit at `start`.
///
/// A leg with an ungeocoded endpoint has no distance: no travel time is
/// added for it and the stop is flagged `approximate`.
pub fn annotate_times(stops: Vec<Stop>, start: OffsetDateTime, model: &TimeModel) -> TimedRoute {
    let mut annotated: Vec<Stop> = Vec::with_capacity(stops.len());
    let mut total_minutes = 0.0;
    let mut total_distance_km = 0.0;

    for mut stop in stops {
        let (arrival, distance) = match annotated.last() {
            None => (start, stop.coordinates.map(|_| 0.0)),
            Some(previous) => {
                let departed = previous.estimated_departure.unwrap_or(start);
                let distance = match (&previous.coordinates, &stop.coordinates) {
                    (Some(from), Some(to)) => Some(from.distance_to(to)),
                    _ => None,
                };
                let travel = distance.map(|km| model.travel_minutes(km)).unwrap_or(0.0);
                total_minutes += travel;
                (departed + Duration::seconds_f64(travel * 60.0), distance)
            }
        };

        let work = model.work_minutes(stop.horse_count);
        total_minutes += work as f64;
        total_distance_km += distance.unwrap_or(0.0);

        stop.approximate = !annotated.is_empty() && distance.is_none();
        stop.distance_from_previous_km = distance;
        stop.estimated_arrival = Some(arrival);
        stop.estimated_departure = Some(arrival + Duration::minutes(work));
        annotated.push(stop);
    }

    TimedRoute {
        stops: annotated,
        total_estimated_minutes: total_minutes,
        total_distance_km,
    }
}
