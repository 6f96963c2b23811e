use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::auth_middleware;
use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/auth/whoami", get(handlers::whoami))
        .route("/api/streak", get(handlers::streak_get))
        .route("/api/streak/activity", post(handlers::streak_activity_post))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
