//! Deterministic results served when the enhanced path cannot run.

use crate::config::RouteConfig;
use crate::constants::MESSAGE_MISSING_LOCATIONS;
use crate::models::{OptimizedRoute, RouteStep, Stop};
use crate::services::maps;
use time::{Duration, Time};

/// Result for a day where no appointment is geocoded: identity order over
/// the full list and a flat work estimate per appointment.
pub fn missing_locations_route(stops: &[Stop], config: &RouteConfig) -> OptimizedRoute {
    let count = u32::try_from(stops.len()).unwrap_or(u32::MAX);
    OptimizedRoute {
        order: (0..stops.len()).collect(),
        total_estimated_minutes: count.saturating_mul(config.work_minutes_per_horse),
        steps: Vec::new(),
        message: Some(MESSAGE_MISSING_LOCATIONS.to_string()),
    }
}

/// Result when no reasoning backend is configured.
///
/// Keeps the input order and places visits at fixed intervals from the
/// start of the day. Travel time is not estimated: without the backend
/// there is nothing better than the work time to report.
pub fn unconfigured_route(stops: &[Stop], config: &RouteConfig) -> OptimizedRoute {
    let steps: Vec<RouteStep> = stops
        .iter()
        .enumerate()
        .map(|(index, stop)| {
            let slot = slot_time(config, index);
            RouteStep {
                appointment_index: index,
                appointment_id: Some(stop.id),
                departure_time: format_hh_mm(slot),
                arrival_time: format_hh_mm(slot),
                work_duration_minutes: stop.horse_count.saturating_mul(config.work_minutes_per_horse),
                maps_url: stop_maps_url(stop),
            }
        })
        .collect();

    OptimizedRoute {
        order: (0..stops.len()).collect(),
        total_estimated_minutes: steps
            .iter()
            .fold(0u32, |sum, step| sum.saturating_add(step.work_duration_minutes)),
        steps,
        message: None,
    }
}

/// Wall-clock slot of the `index`-th visit. Wraps past midnight.
fn slot_time(config: &RouteConfig, index: usize) -> Time {
    let offset = i64::try_from(index)
        .unwrap_or(i64::MAX)
        .saturating_mul(i64::from(config.fallback_interval_minutes));
    config.day_start + Duration::minutes(offset % (24 * 60))
}

pub fn format_hh_mm(time: Time) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

pub(crate) fn stop_maps_url(stop: &Stop) -> String {
    stop.coordinates
        .as_ref()
        .map(maps::destination_url)
        .or_else(|| maps::address_url(&stop.full_address()))
        .unwrap_or_default()
}
