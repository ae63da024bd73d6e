use crate::constants::{MAX_OPTIMIZER_RETRIES, OPTIMIZER_RETRY_DELAY_MS};
use crate::error::{AppError, Result};
use crate::models::OptimizedRoute;
use crate::services::route_optimizer::RouteOptimizer;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use time::Date;
use uuid::Uuid;

/// Client of a remote optimize-route service.
///
/// Every attempt is bounded by `timeout`; a timeout is reported as a failed
/// call, never waited out.
#[derive(Clone)]
pub struct OptimizerClient {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl OptimizerClient {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        OptimizerClient {
            client: Client::new(),
            endpoint,
            bearer_token: None,
            timeout,
            max_retries: 0,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.min(MAX_OPTIMIZER_RETRIES);
        self
    }

    async fn request_once(&self, body: &OptimizeRequestBody) -> Result<OptimizedRoute> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(ref token) = self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::OptimizerCall(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message.or(body.error))
                .unwrap_or_else(|| "Failed to optimize route".to_string());
            return Err(AppError::OptimizerCall(format!("HTTP {}: {}", status, message)));
        }

        response
            .json::<OptimizedRoute>()
            .await
            .map_err(|e| AppError::MalformedOptimizerResponse(e.to_string()))
    }
}

#[async_trait]
impl RouteOptimizer for OptimizerClient {
    async fn optimize_route(&self, farrier_id: Uuid, date: Date) -> Result<OptimizedRoute> {
        let body = OptimizeRequestBody {
            farrier_id,
            date: date.to_string(),
        };
        let attempts = self.max_retries + 1;
        let mut last_error = AppError::OptimizerCall("no attempt made".to_string());

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, self.request_once(&body)).await {
                Ok(Ok(route)) => {
                    validate_remote_route(&route)?;
                    return Ok(route);
                }
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
                endpoint = %self.endpoint,
                "Remote optimizer attempt {}/{} failed: {}",
                attempt, attempts, last_error
            );
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(OPTIMIZER_RETRY_DELAY_MS)).await;
            }
        }

        Err(last_error)
    }
}

/// The service indexes a list the client never sees, so only structure
/// can be checked here: no repeated index, and steps (when present) follow
/// `order` one to one.
fn validate_remote_route(route: &OptimizedRoute) -> Result<()> {
    let mut seen = HashSet::new();
    if let Some(duplicate) = route.order.iter().find(|&&i| !seen.insert(i)) {
        return Err(AppError::MalformedOptimizerResponse(format!(
            "index {} repeated in order",
            duplicate
        )));
    }
    if route.steps.is_empty() {
        return Ok(());
    }
    let step_indices: Vec<usize> = route.steps.iter().map(|s| s.appointment_index).collect();
    if step_indices != route.order {
        return Err(AppError::MalformedOptimizerResponse(format!(
            "steps {:?} do not follow order {:?}",
            step_indices, route.order
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeRequestBody {
    farrier_id: Uuid,
    date: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}
