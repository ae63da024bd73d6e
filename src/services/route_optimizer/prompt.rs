use crate::config::RouteConfig;
use crate::models::{FarrierProfile, Stop};
use crate::services::route_optimizer::fallback::format_hh_mm;
use time::Date;

pub const SYSTEM_PROMPT: &str =
    "You are a route optimization assistant. Always respond with valid JSON only.";

/// Describe the day to the reasoning backend. Only geocoded stops are
/// listed, indexed `0..M` in the order of `geocoded`.
pub fn build_prompt(
    farrier: &FarrierProfile,
    date: Date,
    geocoded: &[&Stop],
    config: &RouteConfig,
) -> String {
    let home = farrier
        .home
        .map(|c| c.as_query_value())
        .unwrap_or_else(|| "unknown".to_string());
    let start = format_hh_mm(config.day_start);
    let minutes_per_10km = config.travel_minutes_per_km * 10.0;

    let mut lines = vec![
        format!("Plan the visiting order for a farrier's working day on {}.", date),
        String::new(),
        "Farrier home base:".to_string(),
        format!("- Address: {}", farrier.address.as_deref().unwrap_or("unknown")),
        format!("- City: {}", farrier.city.as_deref().unwrap_or("unknown")),
        format!("- Coordinates: {}", home),
        String::new(),
        "Appointments (index: customer, address, coordinates, horses):".to_string(),
    ];
    lines.extend(geocoded.iter().enumerate().map(|(index, stop)| {
        let coords = stop
            .coordinates
            .map(|c| c.as_query_value())
            .unwrap_or_default();
        format!(
            "{}: {}, {} ({}) - {} horses",
            index,
            stop.customer_name,
            stop.full_address(),
            coords,
            stop.horse_count
        )
    }));
    lines.extend([
        String::new(),
        "Rules:".to_string(),
        "1. Leave from the home base".to_string(),
        "2. Minimise the total driving distance".to_string(),
        format!(
            "3. Budget {} minutes of work per horse",
            config.work_minutes_per_horse
        ),
        format!("4. Budget {} minutes of driving per 10 km", minutes_per_10km),
        format!("5. Start the day at {}", start),
        "6. Compute distances from the coordinates given".to_string(),
        String::new(),
        "Answer with a single JSON object and nothing else, shaped like:".to_string(),
        format!(
            r#"{{"order": [2, 0, 1], "total_estimated_minutes": 180, "steps": [{{"appointment_index": 2, "departure_time": "{}", "arrival_time": "08:25", "work_duration_minutes": 45, "maps_url": "https://www.google.com/maps/dir/?api=1&destination=LAT,LNG&travelmode=driving"}}]}}"#,
            start
        ),
        "order lists every index above exactly once; total_estimated_minutes is travel plus work; steps has one entry per index of order, in the same sequence.".to_string(),
    ]);
    lines.join("\n")
}
