//! Candidate days for a new appointment, scored by how close the customer
//! is to visits the farrier already has on each day.

use crate::constants::{
    FALLBACK_SUGGESTION_LEAD_DAYS, SHOEING_INTERVAL_WEEKS, SUGGESTED_SLOT_HOUR,
    SUGGESTION_DAYS_RANGE,
};
use crate::models::Coordinates;
use crate::services::route_optimizer::fallback::format_hh_mm;
use time::{Date, Duration, Time};

/// An appointment already on the farrier's calendar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledVisit {
    pub date: Date,
    pub location: Coordinates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateSuggestion {
    pub date: Date,
    /// 50..=95, higher is better
    pub score: u8,
    pub reason: String,
}

/// A single proposed slot, used when no reasoning backend is available.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSuggestion {
    pub proposed_date: Date,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    pub reason: String,
}

/// Score each of the `days_range` days from `target` (default
/// [`SUGGESTION_DAYS_RANGE`]), best first.
///
/// An empty day scores 50. Otherwise the score follows the closest pair of
/// customer location and visit that day: under 5 km 95, under 10 km 85,
/// under 20 km 70, else 50. Equal scores keep calendar order.
pub fn suggest_optimal_dates(
    customer_locations: &[Coordinates],
    existing: &[ScheduledVisit],
    target: Date,
    days_range: Option<u32>,
) -> Vec<DateSuggestion> {
    let days_range = days_range.unwrap_or(SUGGESTION_DAYS_RANGE);
    let mut suggestions: Vec<DateSuggestion> = (0..i64::from(days_range))
        .map_while(|offset| target.checked_add(Duration::days(offset)))
        .map(|date| score_day(customer_locations, existing, date))
        .collect();

    suggestions.sort_by(|a, b| b.score.cmp(&a.score));
    suggestions
}

fn score_day(customer_locations: &[Coordinates], existing: &[ScheduledVisit], date: Date) -> DateSuggestion {
    let visits: Vec<&ScheduledVisit> = existing.iter().filter(|v| v.date == date).collect();
    if visits.is_empty() {
        return DateSuggestion {
            date,
            score: 50,
            reason: "No appointments on this day".to_string(),
        };
    }

    let distances: Vec<f64> = customer_locations
        .iter()
        .flat_map(|customer| visits.iter().map(move |v| customer.distance_to(&v.location)))
        .collect();
    if distances.is_empty() {
        return DateSuggestion {
            date,
            score: 50,
            reason: format!("{} appointment(s), customer location unknown", visits.len()),
        };
    }

    let average = distances.iter().sum::<f64>() / distances.len() as f64;
    let closest = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let score = match closest {
        d if d < 5.0 => 95,
        d if d < 10.0 => 85,
        d if d < 20.0 => 70,
        _ => 50,
    };

    DateSuggestion {
        date,
        score,
        reason: format!(
            "{} appointment(s) nearby (avg {:.1}km)",
            visits.len(),
            average
        ),
    }
}

/// Slot at 10:00 one shoeing interval after `last_shoeing`, or a week from
/// `today` when the last shoeing is unknown.
pub fn interval_slot_suggestion(
    last_shoeing: Option<Date>,
    today: Date,
    work_minutes: u32,
) -> Option<SlotSuggestion> {
    let proposed_date = match last_shoeing {
        Some(last) => last.checked_add(Duration::weeks(SHOEING_INTERVAL_WEEKS))?,
        None => today.checked_add(Duration::days(FALLBACK_SUGGESTION_LEAD_DAYS))?,
    };
    let start = Time::from_hms(SUGGESTED_SLOT_HOUR, 0, 0).ok()?;
    let end = start + Duration::minutes(i64::from(work_minutes));

    Some(SlotSuggestion {
        proposed_date,
        start_time: format_hh_mm(start),
        end_time: format_hh_mm(end),
        reason: format!(
            "Suggested based on {}-week interval from last shoeing",
            SHOEING_INTERVAL_WEEKS
        ),
    })
}
