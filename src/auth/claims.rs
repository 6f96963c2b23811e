use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AuthError;

/// Payload of a token that passed signature, expiry, issuer and audience checks.
///
/// Only [`TokenVerifier`](super::TokenVerifier) constructs this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VerifiedClaims(Map<String, Value>);

/// Identity fields handed to the find-or-create user collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl VerifiedClaims {
    pub(crate) fn new(payload: Map<String, Value>) -> Self {
        Self(payload)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn subject(&self) -> Option<&str> {
        self.str_claim("sub")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_claim("email")
    }

    pub fn given_name(&self) -> Option<&str> {
        self.str_claim("given_name")
    }

    pub fn family_name(&self) -> Option<&str> {
        self.str_claim("family_name")
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn identity(&self) -> Result<UserIdentity, AuthError> {
        let subject = self
            .subject()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::claims("missing sub claim"))?;

        Ok(UserIdentity {
            subject: subject.to_string(),
            email: self.email().map(str::to_string),
            first_name: self.given_name().map(str::to_string),
            last_name: self.family_name().map(str::to_string),
        })
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> VerifiedClaims {
        match value {
            Value::Object(map) => VerifiedClaims::new(map),
            _ => panic!("claims must be an object"),
        }
    }

    #[test]
    fn identity_reads_profile_claims() {
        let c = claims(json!({
            "sub": "user_2abc",
            "email": "ada@example.com",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "exp": 1_700_000_000
        }));

        let identity = c.identity().unwrap();
        assert_eq!(identity.subject, "user_2abc");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
        assert_eq!(identity.first_name.as_deref(), Some("Ada"));
        assert_eq!(identity.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(c.expires_at(), Some(1_700_000_000));
    }

    #[test]
    fn identity_requires_subject() {
        let c = claims(json!({ "email": "ada@example.com" }));
        assert!(matches!(c.identity(), Err(AuthError::Claims(_))));

        let c = claims(json!({ "sub": "" }));
        assert!(matches!(c.identity(), Err(AuthError::Claims(_))));
    }

    #[test]
    fn serializes_as_plain_object() {
        let c = claims(json!({ "sub": "u1", "custom": [1, 2] }));
        assert_eq!(serde_json::to_value(&c).unwrap(), json!({ "sub": "u1", "custom": [1, 2] }));
    }
}
