use axum::Extension;

use crate::middleware::{ApiResponse, AuthUser};

/// GET /api/auth/whoami - the local user and the verified token claims
pub async fn whoami(Extension(auth): Extension<AuthUser>) -> ApiResponse<AuthUser> {
    ApiResponse::success(auth)
}
