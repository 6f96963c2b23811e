use std::sync::Arc;

use axum::{extract::State, Extension};
use chrono::Utc;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::Streak;
use crate::state::AppState;

/// GET /api/streak - current and longest streak for the caller (UTC days)
pub async fn streak_get(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Streak> {
    let today = Utc::now().date_naive();
    let streak = state.streaks.streak_for(auth.user.id, today).await?;
    Ok(ApiResponse::success(streak))
}

/// POST /api/streak/activity - record today's study session
pub async fn streak_activity_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Streak> {
    let today = Utc::now().date_naive();
    let streak = state.streaks.record_activity(auth.user.id, today).await?;
    Ok(ApiResponse::created(streak))
}
