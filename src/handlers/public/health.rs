// handlers/public/health.rs - GET /health handler

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

/// GET /health - liveness plus a store round trip
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.store.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Store unavailable")
    })?;

    Ok(Json(json!({
        "status": "healthy",
        "service": "prix-six",
        "environment": state.config.environment,
        "timestamp": chrono::Utc::now()
    })))
}
