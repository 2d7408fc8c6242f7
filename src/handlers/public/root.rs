// handlers/public/root.rs - GET / handler

use axum::Json;
use serde_json::{json, Value};

/// GET / - service banner and route overview
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Prix Six API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Formula 1 top-six prediction league",
        "endpoints": {
            "public": ["/health", "/api/pub-chat"],
            "protected": [
                "/api/users/me",
                "/api/predictions",
                "/api/scores/:race_id",
                "/api/standings",
                "/api/leagues",
                "/api/presence/heartbeat",
                "/api/admin/challenge",
                "/api/admin/verify"
            ],
            "elevated": [
                "/admin/results",
                "/admin/scores/:race_id/recalculate",
                "/admin/audit-logs",
                "/admin/error-logs",
                "/admin/pub-chat"
            ]
        }
    }))
}
