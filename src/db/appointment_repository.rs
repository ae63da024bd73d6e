use crate::error::Result;
use crate::models::{AppointmentStatus, FarrierProfile};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Raw appointment fields joined with the customer's contact and location
/// columns, before validation. Every store implementation produces this
/// shape; the stop loader turns it into a typed [`Stop`](crate::models::Stop).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StopRow {
    pub id: Uuid,
    pub scheduled_at: OffsetDateTime,
    pub num_horses: i32,
    pub sequence_order: Option<i32>,
    pub status: String,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
}

/// Query interface over the external appointment store.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Appointments of `farrier_id` scheduled in `[from, until)` whose status
    /// is one of `statuses`, joined with their customer.
    async fn find_stops(
        &self,
        farrier_id: Uuid,
        from: OffsetDateTime,
        until: OffsetDateTime,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<StopRow>>;

    async fn find_farrier(&self, farrier_id: Uuid) -> Result<Option<FarrierProfile>>;

    async fn update_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> Result<()>;

    async fn update_scheduled_at(
        &self,
        appointment_id: Uuid,
        scheduled_at: OffsetDateTime,
    ) -> Result<()>;

    async fn update_sequence(&self, appointment_id: Uuid, sequence_index: i32) -> Result<()>;

    /// Cheap reachability check used by the health endpoint
    async fn ping(&self) -> Result<()>;
}

pub struct PgAppointmentRepository {
    pool: sqlx::PgPool,
}

impl PgAppointmentRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    async fn find_stops(
        &self,
        farrier_id: Uuid,
        from: OffsetDateTime,
        until: OffsetDateTime,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<StopRow>> {
        Ok(super::appointment_queries::find_stops_for_window(
            &self.pool, farrier_id, from, until, statuses,
        )
        .await?)
    }

    async fn find_farrier(&self, farrier_id: Uuid) -> Result<Option<FarrierProfile>> {
        Ok(super::appointment_queries::find_farrier_profile(&self.pool, farrier_id).await?)
    }

    async fn update_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> Result<()> {
        let updated =
            super::appointment_queries::update_status(&self.pool, appointment_id, status).await?;
        ensure_updated(updated, appointment_id)
    }

    async fn update_scheduled_at(
        &self,
        appointment_id: Uuid,
        scheduled_at: OffsetDateTime,
    ) -> Result<()> {
        let updated = super::appointment_queries::update_scheduled_at(
            &self.pool,
            appointment_id,
            scheduled_at,
        )
        .await?;
        ensure_updated(updated, appointment_id)
    }

    async fn update_sequence(&self, appointment_id: Uuid, sequence_index: i32) -> Result<()> {
        let updated =
            super::appointment_queries::update_sequence(&self.pool, appointment_id, sequence_index)
                .await?;
        ensure_updated(updated, appointment_id)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

fn ensure_updated(rows_affected: u64, appointment_id: Uuid) -> Result<()> {
    if rows_affected == 0 {
        return Err(crate::error::AppError::NotFound(format!(
            "appointment {} not found",
            appointment_id
        )));
    }
    Ok(())
}
