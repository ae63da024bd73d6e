use crate::error::{AppError, Result};
use crate::models::route::OptimizeRouteRequest;
use crate::models::OptimizedRoute;
use crate::services::route_optimizer::RouteOptimizer;
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// POST /optimize-route
/// Propose a visiting order for one farrier's confirmed appointments of a day
pub async fn optimize_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OptimizeRouteRequest>,
) -> Result<Json<OptimizedRoute>> {
    let (farrier_id, date) = request.validate().map_err(AppError::InvalidRequest)?;

    tracing::info!(
        farrier_id = %farrier_id,
        date = %date,
        configured = state.optimizer.is_configured(),
        "Optimize route request for farrier {} on {}",
        farrier_id, date
    );

    let route = state.optimizer.optimize_route(farrier_id, date).await?;
    Ok(Json(route))
}
