use crate::models::{AppointmentStatus, Coordinates, FarrierProfile};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::appointment_repository::StopRow;

pub async fn find_stops_for_window(
    pool: &PgPool,
    farrier_id: Uuid,
    from: OffsetDateTime,
    until: OffsetDateTime,
    statuses: &[AppointmentStatus],
) -> Result<Vec<StopRow>, sqlx::Error> {
    let status_strs: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();

    sqlx::query_as::<_, StopRow>(
        r#"
        SELECT
            a.id,
            a.proposed_date AS scheduled_at,
            a.num_horses,
            a.sequence_order,
            a.status,
            c.full_name AS customer_name,
            c.address,
            c.city,
            c.latitude,
            c.longitude,
            c.phone
        FROM appointments a
        LEFT JOIN profiles c ON c.id = a.customer_id
        WHERE a.farrier_id = $1
        AND a.proposed_date >= $2
        AND a.proposed_date < $3
        AND a.status = ANY($4)
        ORDER BY a.proposed_date, a.id
        "#,
    )
    .bind(farrier_id)
    .bind(from)
    .bind(until)
    .bind(&status_strs)
    .fetch_all(pool)
    .await
}

#[derive(sqlx::FromRow)]
struct FarrierRow {
    id: Uuid,
    full_name: Option<String>,
    address: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<FarrierRow> for FarrierProfile {
    fn from(row: FarrierRow) -> Self {
        FarrierProfile {
            id: row.id,
            full_name: row.full_name.unwrap_or_default(),
            address: row.address,
            city: row.city,
            home: Coordinates::from_optional(row.latitude, row.longitude),
        }
    }
}

pub async fn find_farrier_profile(
    pool: &PgPool,
    farrier_id: Uuid,
) -> Result<Option<FarrierProfile>, sqlx::Error> {
    let row = sqlx::query_as::<_, FarrierRow>(
        r#"
        SELECT id, full_name, address, city, latitude, longitude
        FROM profiles
        WHERE id = $1 AND role = 'farrier'
        "#,
    )
    .bind(farrier_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(FarrierProfile::from))
}

pub async fn update_status(
    pool: &PgPool,
    appointment_id: Uuid,
    status: AppointmentStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE appointments SET status = $2, updated_at = now() WHERE id = $1",
    )
    .bind(appointment_id)
    .bind(status.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn update_scheduled_at(
    pool: &PgPool,
    appointment_id: Uuid,
    scheduled_at: OffsetDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE appointments SET proposed_date = $2, updated_at = now() WHERE id = $1",
    )
    .bind(appointment_id)
    .bind(scheduled_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn update_sequence(
    pool: &PgPool,
    appointment_id: Uuid,
    sequence_index: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE appointments SET sequence_order = $2, updated_at = now() WHERE id = $1",
    )
    .bind(appointment_id)
    .bind(sequence_index)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
