//! Parsing and validation of the reasoning backend's answer.

use crate::config::parse_hh_mm;
use crate::error::{AppError, Result};
use crate::models::route::is_permutation;
use crate::models::{OptimizedRoute, RouteStep, Stop};
use crate::services::route_optimizer::fallback::{format_hh_mm, stop_maps_url};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct RawOptimizedRoute {
    order: Vec<usize>,
    total_estimated_minutes: f64,
    steps: Vec<RawStep>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    appointment_index: usize,
    departure_time: String,
    arrival_time: String,
    work_duration_minutes: f64,
    #[serde(default)]
    maps_url: String,
}

/// First well-formed JSON object embedded in `text`, which may be wrapped
/// in prose or markdown fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    for (start, _) in text.match_indices('{') {
        let candidate = &text[start..];
        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        if let Some(Ok(Value::Object(_))) = stream.next() {
            return Some(&candidate[..stream.byte_offset()]);
        }
    }
    None
}

/// Parse the backend's answer, indexed over the geocoded subset, and remap
/// it onto the full stop list.
///
/// `geocoded[i]` is the full-list index of subset entry `i`. Nothing is
/// partially applied: any invalid field rejects the whole answer.
pub fn parse_optimizer_response(
    content: &str,
    stops: &[Stop],
    geocoded: &[usize],
) -> Result<OptimizedRoute> {
    let json = extract_json_object(content).ok_or_else(|| {
        AppError::MalformedOptimizerResponse("no JSON object in response".to_string())
    })?;
    let raw: RawOptimizedRoute = serde_json::from_str(json)
        .map_err(|e| AppError::MalformedOptimizerResponse(e.to_string()))?;

    remap_to_full_list(raw, stops, geocoded)
}

fn remap_to_full_list(
    raw: RawOptimizedRoute,
    stops: &[Stop],
    geocoded: &[usize],
) -> Result<OptimizedRoute> {
    if !is_permutation(&raw.order, geocoded.len()) {
        return Err(AppError::MalformedOptimizerResponse(format!(
            "order {:?} is not a permutation of 0..{}",
            raw.order,
            geocoded.len()
        )));
    }
    let step_indices: Vec<usize> = raw.steps.iter().map(|s| s.appointment_index).collect();
    if step_indices != raw.order {
        return Err(AppError::MalformedOptimizerResponse(format!(
            "steps {:?} do not follow order {:?}",
            step_indices, raw.order
        )));
    }
    let total_estimated_minutes = whole_minutes(raw.total_estimated_minutes, "total_estimated_minutes")?;

    let order = raw
        .order
        .iter()
        .map(|&i| full_index(geocoded, i))
        .collect::<Result<Vec<_>>>()?;

    let steps = raw
        .steps
        .into_iter()
        .map(|step| {
            let appointment_index = full_index(geocoded, step.appointment_index)?;
            let stop = stops.get(appointment_index).ok_or_else(|| {
                AppError::MalformedOptimizerResponse(format!(
                    "appointment index {} outside the day's stops",
                    appointment_index
                ))
            })?;
            let maps_url = if step.maps_url.trim().is_empty() {
                stop_maps_url(stop)
            } else {
                step.maps_url
            };
            Ok(RouteStep {
                appointment_index,
                appointment_id: Some(stop.id),
                departure_time: normalize_clock(&step.departure_time)?,
                arrival_time: normalize_clock(&step.arrival_time)?,
                work_duration_minutes: whole_minutes(
                    step.work_duration_minutes,
                    "work_duration_minutes",
                )?,
                maps_url,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(OptimizedRoute {
        order,
        total_estimated_minutes,
        steps,
        message: raw.message,
    })
}

fn full_index(geocoded: &[usize], subset_index: usize) -> Result<usize> {
    geocoded.get(subset_index).copied().ok_or_else(|| {
        AppError::MalformedOptimizerResponse(format!(
            "appointment index {} out of range 0..{}",
            subset_index,
            geocoded.len()
        ))
    })
}

fn whole_minutes(value: f64, field: &str) -> Result<u32> {
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(AppError::MalformedOptimizerResponse(format!(
            "{} is not a valid duration: {}",
            field, value
        )));
    }
    Ok(value.round() as u32)
}

fn normalize_clock(raw: &str) -> Result<String> {
    parse_hh_mm(raw).map(format_hh_mm).ok_or_else(|| {
        AppError::MalformedOptimizerResponse(format!("invalid time of day: '{}'", raw))
    })
}
