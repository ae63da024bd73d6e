use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /debug/health - Check if services are working
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut status = json!({
        "status": "ok",
        "checks": {}
    });

    // Check appointment store
    match state.repo.ping().await {
        Ok(()) => {
            status["checks"]["database"] = json!("ok");
        }
        Err(e) => {
            status["checks"]["database"] = json!({"error": e.to_string()});
            status["status"] = json!("error");
        }
    }

    // Unconfigured is a supported mode, not a failure
    status["checks"]["optimizer"] = match state.optimizer.backend_name() {
        Some(backend) => json!({"configured": true, "backend": backend}),
        None => json!({"configured": false, "mode": "fallback"}),
    };

    Json(status)
}
