#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use recall_api::auth::{AuthError, Jwk, JwkSet, JwksCache, JwksSource, TokenVerifier};
use recall_api::config::AuthConfig;

pub const PRIMARY_KID: &str = "ins_primary";
pub const PRIMARY_PEM: &str = include_str!("../fixtures/primary.pem");
pub const ROGUE_PEM: &str = include_str!("../fixtures/rogue.pem");
const COMPONENTS: &str = include_str!("../fixtures/components.json");

pub enum FixtureKey {
    Primary,
    Rogue,
}

/// Public half of a fixture key as a key set entry
pub fn jwk(kid: &str, key: FixtureKey) -> Jwk {
    let components: Value = serde_json::from_str(COMPONENTS).expect("fixture components");
    let name = match key {
        FixtureKey::Primary => "primary",
        FixtureKey::Rogue => "rogue",
    };

    Jwk {
        kid: Some(kid.to_string()),
        kty: Some("RSA".to_string()),
        alg: Some("RS256".to_string()),
        n: components[name]["n"].as_str().map(str::to_string),
        e: components[name]["e"].as_str().map(str::to_string),
    }
}

pub fn primary_set() -> JwkSet {
    JwkSet {
        keys: vec![jwk(PRIMARY_KID, FixtureKey::Primary)],
    }
}

/// Signs `claims` with RS256 using a PEM fixture
pub fn mint(pem: &str, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key");
    jsonwebtoken::encode(&header, claims, &key).expect("encode test token")
}

pub fn standard_claims() -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "user_2fixture",
        "email": "ada@example.com",
        "given_name": "Ada",
        "family_name": "Lovelace",
        "iss": "https://clerk.recall.test",
        "aud": "recall-web",
        "iat": now,
        "exp": now + 600,
    })
}

pub fn primary_token(claims: &Value) -> String {
    mint(PRIMARY_PEM, Some(PRIMARY_KID), claims)
}

/// In-memory key set source that counts fetches and can be swapped mid-test
pub struct CountingSource {
    set: Mutex<JwkSet>,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn new(set: JwkSet) -> Arc<Self> {
        Arc::new(Self {
            set: Mutex::new(set),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn replace(&self, set: JwkSet) {
        *self.set.lock().expect("source lock") = set;
    }
}

#[async_trait]
impl JwksSource for CountingSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.set.lock().expect("source lock").clone())
    }
}

/// Serves a fixed sequence of key sets, each after its own delay; the last one repeats
pub struct ScriptedSource {
    steps: Vec<(Duration, JwkSet)>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<(Duration, JwkSet)>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JwksSource for ScriptedSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, set) = self.steps[i.min(self.steps.len() - 1)].clone();
        tokio::time::sleep(delay).await;
        Ok(set)
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig::new("clerk.recall.test")
}

pub fn verifier_with(source: Arc<dyn JwksSource>, config: &AuthConfig) -> TokenVerifier {
    let cache = JwksCache::new(source, Duration::from_secs(config.jwks_cache_expiration_seconds));
    TokenVerifier::new(Arc::new(cache), config)
}

/// Local key set endpoint served over real HTTP
pub struct JwksServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

impl JwksServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for JwksServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
struct ServerState {
    status: StatusCode,
    body: Value,
    hits: Arc<AtomicUsize>,
}

async fn serve_jwks(State(state): State<ServerState>) -> (StatusCode, Json<Value>) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (state.status, Json(state.body))
}

pub async fn spawn_jwks_server(status: StatusCode, body: Value) -> Result<JwksServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route("/.well-known/jwks.json", get(serve_jwks))
        .with_state(ServerState {
            status,
            body,
            hits: hits.clone(),
        });

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(JwksServer {
        url: format!("http://127.0.0.1:{}/.well-known/jwks.json", port),
        hits,
        handle,
    })
}
