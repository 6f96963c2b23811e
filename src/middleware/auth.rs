use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::auth::VerifiedClaims;
use crate::database::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, inserted into request extensions by [`auth_middleware`]
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub user: User,
    pub claims: VerifiedClaims,
}

/// Verifies the bearer token, resolves the local user and injects [`AuthUser`]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers()).map_err(ApiError::unauthorized)?;

    let claims = state.verifier.verify(&token).await?;
    let identity = claims.identity()?;
    let user = state.users.find_or_create(&identity).await?;

    tracing::debug!("Authenticated {} as user {}", identity.subject, user.id);
    request.extensions_mut().insert(AuthUser { user, claims });

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, &'static str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    // Scheme names are case-insensitive
    let token = value
        .split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .ok_or("Authorization header must use Bearer token format")?;

    if token.is_empty() {
        return Err("Empty bearer token");
    }
    Ok(token.to_string())
}
