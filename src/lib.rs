// Library exports for testing and reusability

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use error::{AppError, Result};

// App state for sharing across the application
use db::AppointmentRepository;
use services::route_optimizer::EnhancedOptimizer;
use std::sync::Arc;

pub struct AppState {
    pub repo: Arc<dyn AppointmentRepository>,
    pub optimizer: EnhancedOptimizer,
}
