use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{crypto, Algorithm};
use serde_json::{Map, Value};

use super::claims::VerifiedClaims;
use super::error::AuthError;
use super::jwks::{HttpJwksSource, JwksCache};
use crate::config::AuthConfig;

/// Verifies RS256 bearer tokens against a shared [`JwksCache`].
///
/// Issuer and audience are only compared when configured. The expiry check
/// tolerates `leeway_seconds` of clock skew.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<JwksCache>,
    issuer: Option<String>,
    audience: Option<String>,
    leeway_seconds: u64,
}

impl TokenVerifier {
    pub fn new(keys: Arc<JwksCache>, config: &AuthConfig) -> Self {
        Self {
            keys,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            leeway_seconds: config.expiration_leeway_seconds,
        }
    }

    /// Verifier backed by the instance's well-known key set endpoint.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let source = HttpJwksSource::from_config(config)?;
        let cache = JwksCache::new(
            Arc::new(source),
            Duration::from_secs(config.jwks_cache_expiration_seconds),
        );
        Ok(Self::new(Arc::new(cache), config))
    }

    pub fn key_cache(&self) -> &Arc<JwksCache> {
        &self.keys
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        self.verify_at(token, Utc::now().timestamp()).await
    }

    /// Same as [`verify`](Self::verify) with an explicit clock (epoch seconds).
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<VerifiedClaims, AuthError> {
        let parts = split_token(token)?;
        let header = decode_segment(parts.header, "header")?;
        let payload = decode_segment(parts.payload, "payload")?;
        URL_SAFE_NO_PAD
            .decode(parts.signature)
            .map_err(|e| AuthError::token_format(format!("signature is not base64url: {}", e)))?;

        if let Some(alg) = header.get("alg") {
            if alg.as_str() != Some("RS256") {
                return Err(AuthError::token_format(format!("unsupported algorithm {}", alg)));
            }
        }

        let kid = header
            .get("kid")
            .and_then(Value::as_str)
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::key_resolution("token header has no kid"))?;

        let key = self.keys.resolve(kid).await?;

        // Signed bytes are the segments exactly as transmitted
        let message = &token[..parts.header.len() + 1 + parts.payload.len()];
        let valid = crypto::verify(parts.signature, message.as_bytes(), &key, Algorithm::RS256)
            .map_err(|_| AuthError::Signature)?;
        if !valid {
            return Err(AuthError::Signature);
        }

        self.validate_claims(&payload, now)?;

        Ok(VerifiedClaims::new(payload))
    }

    fn validate_claims(&self, payload: &Map<String, Value>, now: i64) -> Result<(), AuthError> {
        let exp = payload
            .get("exp")
            .and_then(Value::as_f64)
            .ok_or_else(|| AuthError::claims("exp claim missing or not a number"))?;

        if exp + self.leeway_seconds as f64 <= now as f64 {
            return Err(AuthError::claims("token expired"));
        }

        if let Some(expected) = &self.issuer {
            if payload.get("iss").and_then(Value::as_str) != Some(expected.as_str()) {
                return Err(AuthError::claims("issuer mismatch"));
            }
        }

        if let Some(expected) = &self.audience {
            if payload.get("aud").and_then(Value::as_str) != Some(expected.as_str()) {
                return Err(AuthError::claims("audience mismatch"));
            }
        }

        Ok(())
    }
}

struct TokenParts<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
}

fn split_token(token: &str) -> Result<TokenParts<'_>, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::token_format(format!(
            "expected 3 dot-separated segments, found {}",
            segments.len()
        )));
    }

    Ok(TokenParts {
        header: segments[0],
        payload: segments[1],
        signature: segments[2],
    })
}

fn decode_segment(segment: &str, name: &str) -> Result<Map<String, Value>, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::token_format(format!("{} is not base64url: {}", name, e)))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AuthError::token_format(format!("{} is not a JSON object", name))),
        Err(e) => Err(AuthError::token_format(format!("{} is not valid JSON: {}", name, e))),
    }
}
