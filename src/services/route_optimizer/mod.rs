//! Enhanced (reasoning-backed) route optimization and its fallback policy.
//!
//! Precedence, for one farrier and day:
//! 1. no routable appointment: empty result with a message
//! 2. none geocoded: identity order with a flat estimate and a message
//! 3. backend unconfigured: deterministic fixed-interval schedule
//! 4. backend called: its answer, remapped to the full list, or an error.
//!    A failed attempt never degrades to (3); the caller decides whether to
//!    retry or use the local nearest-neighbour router.

pub mod fallback;
pub mod prompt;
pub mod response;

use crate::config::{OptimizerConfig, RouteConfig};
use crate::constants::{MESSAGE_NO_APPOINTMENTS, OPTIMIZER_RETRY_DELAY_MS};
use crate::error::{AppError, Result};
use crate::models::{FarrierProfile, OptimizedRoute, Stop};
use crate::services::reasoning::ReasoningBackend;
use crate::services::stop_loader::{LoadOptions, StopLoader};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use time::Date;
use uuid::Uuid;

/// Anything that can propose a visiting order for a farrier's day.
#[async_trait]
pub trait RouteOptimizer: Send + Sync {
    async fn optimize_route(&self, farrier_id: Uuid, date: Date) -> Result<OptimizedRoute>;
}

pub struct EnhancedOptimizer {
    loader: StopLoader,
    backend: Option<Arc<dyn ReasoningBackend>>,
    route_config: RouteConfig,
    timeout: Duration,
    max_retries: u32,
}

impl EnhancedOptimizer {
    /// `backend = None` means the optimizer is unconfigured.
    pub fn new(
        loader: StopLoader,
        backend: Option<Arc<dyn ReasoningBackend>>,
        route_config: RouteConfig,
        optimizer_config: &OptimizerConfig,
    ) -> Self {
        EnhancedOptimizer {
            loader,
            backend,
            route_config,
            timeout: optimizer_config.timeout,
            max_retries: optimizer_config.max_retries,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.backend_name())
    }

    /// Apply the fallback policy to an already loaded day, in schedule order.
    pub async fn optimize_stops(
        &self,
        farrier: &FarrierProfile,
        date: Date,
        stops: &[Stop],
    ) -> Result<OptimizedRoute> {
        if stops.is_empty() {
            return Ok(OptimizedRoute::empty(MESSAGE_NO_APPOINTMENTS));
        }

        let geocoded: Vec<usize> = stops
            .iter()
            .enumerate()
            .filter(|(_, stop)| stop.is_geocoded())
            .map(|(index, _)| index)
            .collect();
        if geocoded.is_empty() {
            tracing::info!(
                farrier_id = %farrier.id,
                stops = stops.len(),
                "No geocoded appointments for {}, returning identity order",
                date
            );
            return Ok(fallback::missing_locations_route(stops, &self.route_config));
        }

        let Some(backend) = self.backend.as_ref() else {
            tracing::warn!(
                farrier_id = %farrier.id,
                stops = stops.len(),
                "Route optimizer unconfigured, serving fixed-interval fallback for {}",
                date
            );
            return Ok(fallback::unconfigured_route(stops, &self.route_config));
        };

        let subset: Vec<&Stop> = geocoded.iter().filter_map(|&i| stops.get(i)).collect();
        let prompt = prompt::build_prompt(farrier, date, &subset, &self.route_config);
        let content = self.complete_with_retry(backend.as_ref(), &prompt).await?;
        let route = response::parse_optimizer_response(&content, stops, &geocoded)?;

        tracing::info!(
            farrier_id = %farrier.id,
            backend = backend.backend_name(),
            stops = stops.len(),
            geocoded = geocoded.len(),
            total_minutes = route.total_estimated_minutes,
            "Optimized route for {}: {} stops, {} min",
            date, geocoded.len(), route.total_estimated_minutes
        );
        Ok(route)
    }

    /// Each attempt runs under the timeout; a timeout counts as a failed
    /// call. Only call failures are retried, malformed answers are not.
    async fn complete_with_retry(
        &self,
        backend: &dyn ReasoningBackend,
        prompt: &str,
    ) -> Result<String> {
        let attempts = self.max_retries + 1;
        let mut last_error = AppError::OptimizerCall("no attempt made".to_string());

        for attempt in 1..=attempts {
            let outcome =
                tokio::time::timeout(self.timeout, backend.complete(prompt::SYSTEM_PROMPT, prompt))
                    .await;
            match outcome {
                Ok(Ok(content)) => return Ok(content),
                Ok(Err(AppError::OptimizerCall(message))) => {
                    last_error = AppError::OptimizerCall(message);
                }
                Ok(Err(other)) => return Err(other),
                Err(_) => {
                    last_error = AppError::OptimizerCall(format!(
                        "timed out after {} ms",
                        self.timeout.as_millis()
                    ));
                }
            }

            tracing::warn!(
                attempt,
                attempts,
                "Optimizer attempt {}/{} failed: {}",
                attempt, attempts, last_error
            );
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(OPTIMIZER_RETRY_DELAY_MS)).await;
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl RouteOptimizer for EnhancedOptimizer {
    async fn optimize_route(&self, farrier_id: Uuid, date: Date) -> Result<OptimizedRoute> {
        let farrier = self
            .loader
            .find_farrier(farrier_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Farrier not found".to_string()))?;

        let stops = self
            .loader
            .fetch_stops(farrier_id, date, LoadOptions::by_schedule())
            .await?;

        self.optimize_stops(&farrier, date, &stops).await
    }
}
