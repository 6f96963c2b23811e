use thiserror::Error;

/// Token verification failures.
///
/// Every variant is an authentication failure from the caller's point of view;
/// the split exists for logging and tests.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong segment count, bad base64url, bad JSON or unsupported algorithm.
    #[error("Invalid token format: {0}")]
    TokenFormat(String),

    /// No `kid` in the header, or no key for it even after a forced refresh.
    #[error("Unable to resolve signing key: {0}")]
    KeyResolution(String),

    #[error("Invalid token signature")]
    Signature,

    /// Expired, or issuer/audience mismatch.
    #[error("Invalid token claims: {0}")]
    Claims(String),

    /// The key set could not be fetched or decoded.
    #[error("Failed to refresh signing keys: {0}")]
    KeyRefresh(String),
}

impl AuthError {
    pub fn token_format(message: impl Into<String>) -> Self {
        AuthError::TokenFormat(message.into())
    }

    pub fn key_resolution(message: impl Into<String>) -> Self {
        AuthError::KeyResolution(message.into())
    }

    pub fn claims(message: impl Into<String>) -> Self {
        AuthError::Claims(message.into())
    }

    pub fn key_refresh(message: impl Into<String>) -> Self {
        AuthError::KeyRefresh(message.into())
    }

    /// Message that is safe to hand back to an unauthenticated client.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::KeyRefresh(_) => "Unable to verify token at this time".to_string(),
            other => other.to_string(),
        }
    }
}
