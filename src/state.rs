use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::database::{DatabaseManager, UserStore};
use crate::services::StreakService;

/// Shared handles for request handlers and middleware
pub struct AppState {
    pub verifier: TokenVerifier,
    pub users: Arc<dyn UserStore>,
    pub streaks: StreakService,
    /// Absent when running on in-memory stores
    pub database: Option<DatabaseManager>,
}
