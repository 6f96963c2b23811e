use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// GET /health - liveness plus database and key cache status
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let cached_keys = state.verifier.key_cache().key_ids().await.len();

    let database = match &state.database {
        Some(db) => db.health_check().await.map(|_| "ok"),
        None => Ok("memory"),
    };

    match database {
        Ok(database) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": database,
                    "cached_keys": cached_keys
                }
            })),
        ),
        Err(err) => {
            tracing::error!("Database health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
