//! Bearer token verification against the identity provider's published key set.
//!
//! ```text
//! token → split/decode → kid → JwksCache (TTL refresh, forced refresh on miss)
//!       → RS256 signature over "header.payload" → exp/iss/aud → VerifiedClaims
//! ```

pub mod claims;
pub mod error;
pub mod jwks;
pub mod verifier;

pub use claims::{UserIdentity, VerifiedClaims};
pub use error::AuthError;
pub use jwks::{HttpJwksSource, Jwk, JwkSet, JwksCache, JwksSource, KeySet};
pub use verifier::TokenVerifier;
