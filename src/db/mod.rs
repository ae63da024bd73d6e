use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

mod appointment_queries;
pub mod appointment_repository;

pub use appointment_repository::{AppointmentRepository, PgAppointmentRepository, StopRow};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}
