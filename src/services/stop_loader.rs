use crate::constants::UNKNOWN_CUSTOMER_NAME;
use crate::db::{AppointmentRepository, StopRow};
use crate::error::{AppError, Result};
use crate::models::{AppointmentStatus, Coordinates, FarrierProfile, Stop};
use crate::session::SessionContext;
use std::sync::Arc;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use uuid::Uuid;

/// Order in which a loaded day is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopOrder {
    /// Previously chosen order (`sequence_index` ascending, unsequenced
    /// stops last by scheduled time)
    #[default]
    Sequence,
    /// Scheduled time ascending
    ScheduledAt,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub order: StopOrder,
    /// Also return stops already completed today (full-day view)
    pub include_completed: bool,
}

impl LoadOptions {
    pub fn by_schedule() -> Self {
        LoadOptions {
            order: StopOrder::ScheduledAt,
            include_completed: false,
        }
    }

    fn statuses(&self) -> Vec<AppointmentStatus> {
        let mut statuses = AppointmentStatus::ROUTABLE.to_vec();
        if self.include_completed {
            statuses.push(AppointmentStatus::Completed);
        }
        statuses
    }
}

/// Fetches a farrier's appointments for one day and turns the loosely
/// shaped store rows into validated [`Stop`]s.
#[derive(Clone)]
pub struct StopLoader {
    repo: Arc<dyn AppointmentRepository>,
    utc_offset: UtcOffset,
}

impl StopLoader {
    pub fn new(repo: Arc<dyn AppointmentRepository>, utc_offset: UtcOffset) -> Self {
        StopLoader { repo, utc_offset }
    }

    /// `[date 00:00, date+1 00:00)` in the configured offset
    pub fn day_window(&self, date: Date) -> Result<(OffsetDateTime, OffsetDateTime)> {
        let next = date
            .next_day()
            .ok_or_else(|| AppError::InvalidRequest(format!("date out of range: {}", date)))?;
        let start = PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(self.utc_offset);
        let end = PrimitiveDateTime::new(next, Time::MIDNIGHT).assume_offset(self.utc_offset);
        Ok((start, end))
    }

    /// Load the day route of `farrier_id` on behalf of the session user.
    ///
    /// An empty day is `Ok(vec![])`; an unreachable store or an invalid
    /// row is a `LoadFailure`.
    pub async fn load_stops_for_day(
        &self,
        session: &SessionContext,
        farrier_id: Uuid,
        date: Date,
        options: LoadOptions,
    ) -> Result<Vec<Stop>> {
        session.ensure_route_owner(farrier_id)?;
        self.fetch_stops(farrier_id, date, options).await
    }

    /// Same as [`load_stops_for_day`](Self::load_stops_for_day) for trusted
    /// server-side callers that carry no end-user session.
    pub async fn fetch_stops(
        &self,
        farrier_id: Uuid,
        date: Date,
        options: LoadOptions,
    ) -> Result<Vec<Stop>> {
        let (from, until) = self.day_window(date)?;
        let statuses = options.statuses();

        let rows = self
            .repo
            .find_stops(farrier_id, from, until, &statuses)
            .await
            .map_err(|e| AppError::LoadFailure(e.to_string()))?;

        let mut stops = rows
            .into_iter()
            .map(|row| normalize_row(row, &statuses))
            .collect::<Result<Vec<_>>>()?;
        sort_stops(&mut stops, options.order);

        tracing::debug!(
            farrier_id = %farrier_id,
            date = %date,
            stops = stops.len(),
            geocoded = stops.iter().filter(|s| s.is_geocoded()).count(),
            "Loaded {} stops for {}",
            stops.len(), date
        );
        Ok(stops)
    }

    pub async fn find_farrier(&self, farrier_id: Uuid) -> Result<Option<FarrierProfile>> {
        self.repo
            .find_farrier(farrier_id)
            .await
            .map_err(|e| AppError::LoadFailure(e.to_string()))
    }
}

/// Validate one store row. Optional fields that are missing or unusable
/// become `None`; structural problems fail the whole load.
pub fn normalize_row(row: StopRow, allowed: &[AppointmentStatus]) -> Result<Stop> {
    let status: AppointmentStatus = row
        .status
        .parse()
        .map_err(|e| AppError::LoadFailure(format!("appointment {}: {}", row.id, e)))?;
    if !allowed.contains(&status) {
        return Err(AppError::LoadFailure(format!(
            "appointment {} has status '{}' outside the requested set",
            row.id, status
        )));
    }

    let horse_count = u32::try_from(row.num_horses)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            AppError::LoadFailure(format!(
                "appointment {} has invalid horse count {}",
                row.id, row.num_horses
            ))
        })?;

    let coordinates = Coordinates::from_optional(row.latitude, row.longitude);
    if coordinates.is_none() && (row.latitude.is_some() || row.longitude.is_some()) {
        tracing::warn!(
            appointment_id = %row.id,
            "Unusable coordinates ({:?}, {:?}) for appointment {}, treating as not geocoded",
            row.latitude, row.longitude, row.id
        );
    }

    let customer_name = row
        .customer_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_CUSTOMER_NAME.to_string());

    Ok(Stop {
        id: row.id,
        customer_name,
        address: row.address.unwrap_or_default(),
        city: row.city.unwrap_or_default(),
        coordinates,
        phone: row.phone.filter(|p| !p.trim().is_empty()),
        scheduled_at: row.scheduled_at,
        horse_count,
        sequence_index: row.sequence_order,
        status,
        distance_from_previous_km: None,
        estimated_arrival: None,
        estimated_departure: None,
        approximate: false,
    })
}

/// Deterministic ordering, so reloads of unchanged data give the same list.
pub fn sort_stops(stops: &mut [Stop], order: StopOrder) {
    match order {
        StopOrder::Sequence => stops.sort_by(|a, b| {
            (a.sequence_index.is_none(), a.sequence_index, a.scheduled_at, a.id).cmp(&(
                b.sequence_index.is_none(),
                b.sequence_index,
                b.scheduled_at,
                b.id,
            ))
        }),
        StopOrder::ScheduledAt => {
            stops.sort_by(|a, b| (a.scheduled_at, a.id).cmp(&(b.scheduled_at, b.id)))
        }
    }
}
