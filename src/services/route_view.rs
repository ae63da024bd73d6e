//! In-memory day route owned by one view, and the mutations applied to it.
//!
//! Mutations are optimistic: the view changes first, the store write
//! follows, and a failed write restores the previous state before the
//! error is returned.

use crate::constants::{
    DEFAULT_REGION_DELTA, DEFAULT_REGION_LAT, DEFAULT_REGION_LNG, MIN_REGION_DELTA,
    REGION_PADDING_FACTOR, RESCHEDULE_SNAP_MINUTES,
};
use crate::db::AppointmentRepository;
use crate::error::{AppError, Result};
use crate::models::{AppointmentStatus, Coordinates, MapRegion, OptimizedRoute, Stop, TimedRoute};
use crate::services::maps;
use crate::services::nearest_neighbor::order_by_proximity;
use crate::services::route_optimizer::RouteOptimizer;
use crate::services::stop_loader::{sort_stops, LoadOptions, StopLoader, StopOrder};
use crate::services::time_estimator::{annotate_times, TimeModel};
use crate::session::SessionContext;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// The change was already in place; nothing was written
    AlreadyApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    Enhanced,
    NearestNeighbor,
}

/// What [`RouteView::optimize_or_nearest`] ended up doing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    pub strategy: OptimizationStrategy,
    /// Why the enhanced result was not used
    pub fallback_reason: Option<String>,
    pub message: Option<String>,
    pub total_estimated_minutes: Option<u32>,
}

pub struct RouteView {
    farrier_id: Uuid,
    date: Date,
    stops: Vec<Stop>,
    completed: Vec<Stop>,
}

impl RouteView {
    /// Split a loaded day into active and completed stops. `stops` keep
    /// their order within each list.
    pub fn new(farrier_id: Uuid, date: Date, stops: Vec<Stop>) -> Self {
        let (completed, stops): (Vec<Stop>, Vec<Stop>) = stops
            .into_iter()
            .partition(|stop| stop.status == AppointmentStatus::Completed);
        RouteView {
            farrier_id,
            date,
            stops,
            completed,
        }
    }

    /// Load the day for this view. Completed stops are always loaded, so a
    /// completion made elsewhere shows up as already applied.
    pub async fn load(
        loader: &StopLoader,
        session: &SessionContext,
        farrier_id: Uuid,
        date: Date,
        options: LoadOptions,
    ) -> Result<Self> {
        let options = LoadOptions {
            include_completed: true,
            ..options
        };
        let stops = loader
            .load_stops_for_day(session, farrier_id, date, options)
            .await?;
        Ok(RouteView::new(farrier_id, date, stops))
    }

    pub fn farrier_id(&self) -> Uuid {
        self.farrier_id
    }

    pub fn date(&self) -> Date {
        self.date
    }

    /// Active stops, in visiting order
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn completed(&self) -> &[Stop] {
        &self.completed
    }

    pub fn find(&self, stop_id: Uuid) -> Option<&Stop> {
        self.stops
            .iter()
            .chain(self.completed.iter())
            .find(|stop| stop.id == stop_id)
    }

    /// Mark a visit done. A stop that is already completed is a no-op, so
    /// two sources completing the same stop both succeed.
    pub async fn mark_completed(
        &mut self,
        repo: &dyn AppointmentRepository,
        session: &SessionContext,
        stop_id: Uuid,
    ) -> Result<MutationOutcome> {
        session.ensure_route_owner(self.farrier_id)?;

        if self.completed.iter().any(|stop| stop.id == stop_id) {
            tracing::debug!(stop_id = %stop_id, "Stop already completed");
            return Ok(MutationOutcome::AlreadyApplied);
        }
        let position = self.position_of(stop_id)?;

        let mut stop = self.stops.remove(position);
        let previous_status = stop.status;
        stop.status = AppointmentStatus::Completed;

        if let Err(e) = repo
            .update_status(stop_id, AppointmentStatus::Completed)
            .await
        {
            stop.status = previous_status;
            self.stops.insert(position, stop);
            tracing::warn!(
                stop_id = %stop_id,
                "Rolled back completion of {}: {}",
                stop_id, e
            );
            return Err(AppError::MutationWrite(e.to_string()));
        }

        tracing::info!(
            stop_id = %stop_id,
            remaining = self.stops.len(),
            "Marked stop {} completed",
            stop_id
        );
        self.completed.push(stop);
        Ok(MutationOutcome::Applied)
    }

    /// Move a visit to the quarter hour nearest `dropped_at`. The visiting
    /// order is left alone; returns the time actually stored.
    pub async fn reschedule(
        &mut self,
        repo: &dyn AppointmentRepository,
        session: &SessionContext,
        stop_id: Uuid,
        dropped_at: OffsetDateTime,
    ) -> Result<OffsetDateTime> {
        session.ensure_route_owner(self.farrier_id)?;

        if self.completed.iter().any(|stop| stop.id == stop_id) {
            return Err(AppError::InvalidRequest(format!(
                "stop {} is already completed",
                stop_id
            )));
        }
        let position = self.position_of(stop_id)?;
        let snapped = snap_to_quarter_hour(dropped_at);

        let previous = self.stops[position].scheduled_at;
        if previous == snapped {
            return Ok(snapped);
        }
        self.stops[position].scheduled_at = snapped;

        if let Err(e) = repo.update_scheduled_at(stop_id, snapped).await {
            self.stops[position].scheduled_at = previous;
            tracing::warn!(
                stop_id = %stop_id,
                "Rolled back reschedule of {}: {}",
                stop_id, e
            );
            return Err(AppError::MutationWrite(e.to_string()));
        }

        tracing::debug!(stop_id = %stop_id, "Rescheduled {} to {}", stop_id, snapped);
        Ok(snapped)
    }

    /// Map area covering the active geocoded stops
    pub fn region(&self) -> MapRegion {
        region_for(&self.stops)
    }

    /// Greedy reorder of the active stops. The walk starts at the last
    /// completed geocoded stop, else at `home`.
    pub fn reorder_by_proximity(&mut self, home: Option<Coordinates>) {
        let anchor = self
            .completed
            .iter()
            .rev()
            .find_map(|stop| stop.coordinates)
            .or(home);
        let stops = std::mem::take(&mut self.stops);
        self.stops = order_by_proximity(stops, anchor);
        self.stops.iter_mut().for_each(Stop::clear_estimates);
    }

    /// Reorder the active stops as the optimizer proposed.
    ///
    /// `order` is the visiting order. Each index resolves through the id of
    /// the step carrying it, else through the active stops in schedule
    /// order, which is how the optimizer loads them. Stops completed since
    /// the optimization are skipped; stops the result does not mention go
    /// last in their current order. An index or id that matches nothing, a
    /// repeated stop, or steps that disagree with each other reject the
    /// whole result and leave the view untouched.
    pub fn apply_optimized(&mut self, route: &OptimizedRoute) -> Result<()> {
        let ids = self.proposed_ids(route)?;

        let mut seen = HashSet::new();
        let mut positions = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id) {
                return Err(AppError::MalformedOptimizerResponse(format!(
                    "appointment {} appears twice",
                    id
                )));
            }
            match self.stops.iter().position(|stop| stop.id == id) {
                Some(position) => positions.push(position),
                None if self.completed.iter().any(|stop| stop.id == id) => {}
                None => {
                    return Err(AppError::MalformedOptimizerResponse(format!(
                        "unknown appointment {}",
                        id
                    )))
                }
            }
        }

        let mut slots: Vec<Option<Stop>> = std::mem::take(&mut self.stops)
            .into_iter()
            .map(Some)
            .collect();
        let mut reordered: Vec<Stop> = positions
            .iter()
            .filter_map(|&position| slots[position].take())
            .collect();
        reordered.extend(slots.into_iter().flatten());
        reordered.iter_mut().for_each(Stop::clear_estimates);
        self.stops = reordered;
        Ok(())
    }

    fn proposed_ids(&self, route: &OptimizedRoute) -> Result<Vec<Uuid>> {
        let mut step_ids: HashMap<usize, Uuid> = HashMap::new();
        for step in &route.steps {
            if !route.order.contains(&step.appointment_index) {
                return Err(AppError::MalformedOptimizerResponse(format!(
                    "step for index {} not in order",
                    step.appointment_index
                )));
            }
            let Some(id) = step.appointment_id else {
                continue;
            };
            if let Some(previous) = step_ids.insert(step.appointment_index, id) {
                if previous != id {
                    return Err(AppError::MalformedOptimizerResponse(format!(
                        "index {} names two appointments",
                        step.appointment_index
                    )));
                }
            }
        }

        let mut by_schedule = self.stops.clone();
        sort_stops(&mut by_schedule, StopOrder::ScheduledAt);
        route
            .order
            .iter()
            .map(|index| match step_ids.get(index) {
                Some(&id) => Ok(id),
                None => by_schedule.get(*index).map(|stop| stop.id).ok_or_else(|| {
                    AppError::MalformedOptimizerResponse(format!(
                        "index {} outside the {} active stops",
                        index,
                        by_schedule.len()
                    ))
                }),
            })
            .collect()
    }

    /// Ask `optimizer` for an order and fall back to the nearest-neighbour
    /// router when the enhanced path fails. Other errors (store, access)
    /// are returned as-is and leave the order unchanged.
    pub async fn optimize_or_nearest(
        &mut self,
        optimizer: &dyn RouteOptimizer,
        home: Option<Coordinates>,
    ) -> Result<OptimizationOutcome> {
        let failure = match optimizer.optimize_route(self.farrier_id, self.date).await {
            Ok(route) => match self.apply_optimized(&route) {
                Ok(()) => {
                    return Ok(OptimizationOutcome {
                        strategy: OptimizationStrategy::Enhanced,
                        fallback_reason: None,
                        message: route.message,
                        total_estimated_minutes: Some(route.total_estimated_minutes),
                    })
                }
                Err(e) => e,
            },
            Err(e) if e.is_optimizer_failure() => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            farrier_id = %self.farrier_id,
            "Enhanced optimization failed, using nearest neighbour: {}",
            failure
        );
        self.reorder_by_proximity(home);
        Ok(OptimizationOutcome {
            strategy: OptimizationStrategy::NearestNeighbor,
            fallback_reason: Some(failure.to_string()),
            message: None,
            total_estimated_minutes: None,
        })
    }

    /// Store the current visiting order as each active stop's sequence
    /// index. On a failed write the in-memory indices are restored; rows
    /// written before the failure keep their new value.
    pub async fn persist_order(
        &mut self,
        repo: &dyn AppointmentRepository,
        session: &SessionContext,
    ) -> Result<()> {
        session.ensure_route_owner(self.farrier_id)?;

        let previous: Vec<Option<i32>> = self.stops.iter().map(|s| s.sequence_index).collect();
        for position in 0..self.stops.len() {
            let index = i32::try_from(position)
                .map_err(|_| AppError::Internal("too many stops to sequence".to_string()))?;
            let stop_id = self.stops[position].id;
            self.stops[position].sequence_index = Some(index);

            if let Err(e) = repo.update_sequence(stop_id, index).await {
                for (stop, index) in self.stops.iter_mut().zip(&previous) {
                    stop.sequence_index = *index;
                }
                tracing::warn!(
                    farrier_id = %self.farrier_id,
                    "Failed to persist visiting order at stop {}: {}",
                    stop_id, e
                );
                return Err(AppError::MutationWrite(e.to_string()));
            }
        }

        tracing::info!(
            farrier_id = %self.farrier_id,
            stops = self.stops.len(),
            "Persisted visiting order for {}",
            self.date
        );
        Ok(())
    }

    /// Estimated arrival and departure for the active stops from `start`
    pub fn timeline(&self, start: OffsetDateTime, model: &TimeModel) -> TimedRoute {
        annotate_times(self.stops.clone(), start, model)
    }

    pub fn next_stop_maps_url(&self) -> Option<String> {
        self.stops
            .iter()
            .find_map(|stop| stop.coordinates)
            .map(|coordinates| maps::destination_url(&coordinates))
    }

    /// One link through every active geocoded stop, in visiting order
    pub fn route_maps_url(&self, home: Option<&Coordinates>) -> Option<String> {
        let points: Vec<Coordinates> = self.stops.iter().filter_map(|s| s.coordinates).collect();
        maps::route_url(home, &points)
    }

    fn position_of(&self, stop_id: Uuid) -> Result<usize> {
        self.stops
            .iter()
            .position(|stop| stop.id == stop_id)
            .ok_or_else(|| AppError::NotFound(format!("stop {} not in this route", stop_id)))
    }
}

/// Nearest quarter hour of `at`, in its own offset. Exactly half way
/// rounds up.
pub fn snap_to_quarter_hour(at: OffsetDateTime) -> OffsetDateTime {
    const NANOS_PER_SECOND: i64 = 1_000_000_000;
    let step = RESCHEDULE_SNAP_MINUTES * 60 * NANOS_PER_SECOND;
    let (hour, minute, second, nano) = at.to_hms_nano();
    let since_midnight = (i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second))
        * NANOS_PER_SECOND
        + i64::from(nano);
    let remainder = since_midnight % step;

    let down = at - Duration::nanoseconds(remainder);
    if remainder * 2 >= step {
        down + Duration::minutes(RESCHEDULE_SNAP_MINUTES)
    } else {
        down
    }
}

/// Bounding region of the geocoded `stops`, padded on each axis and never
/// narrower than [`MIN_REGION_DELTA`]. Falls back to a default region when
/// none is geocoded.
pub fn region_for(stops: &[Stop]) -> MapRegion {
    let mut points = stops.iter().filter_map(|stop| stop.coordinates);
    let Some(first) = points.next() else {
        return MapRegion {
            center: Coordinates {
                lat: DEFAULT_REGION_LAT,
                lng: DEFAULT_REGION_LNG,
            },
            lat_delta: DEFAULT_REGION_DELTA,
            lng_delta: DEFAULT_REGION_DELTA,
        };
    };

    let (min_lat, max_lat, min_lng, max_lng) = points.fold(
        (first.lat, first.lat, first.lng, first.lng),
        |(min_lat, max_lat, min_lng, max_lng), p| {
            (
                min_lat.min(p.lat),
                max_lat.max(p.lat),
                min_lng.min(p.lng),
                max_lng.max(p.lng),
            )
        },
    );

    let padded = |span: f64| (span * (1.0 + REGION_PADDING_FACTOR)).max(MIN_REGION_DELTA);
    MapRegion {
        center: Coordinates {
            lat: (min_lat + max_lat) / 2.0,
            lng: (min_lng + max_lng) / 2.0,
        },
        lat_delta: padded(max_lat - min_lat),
        lng_delta: padded(max_lng - min_lng),
    }
}
