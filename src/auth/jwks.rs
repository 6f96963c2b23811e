//! JSON Web Key Set retrieval and the process-wide signing key cache.
//!
//! The cache never mutates a published [`KeySet`]. A refresh builds a complete
//! replacement off to the side and swaps the shared `Arc` under a short write
//! lock, so readers observe either the previous set or the new one. Keys that
//! disappear from the provider's set disappear from the cache on the same swap.
//!
//! Fetches run one at a time behind `refresh_lock` and each snapshot is stamped
//! with the instant its fetch started. Snapshots are therefore published in fetch
//! order, and a caller whose request predates the published fetch reuses it
//! instead of going back to the provider.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::error::AuthError;
use crate::config::AuthConfig;

/// One entry of the provider's key set. Only RSA entries are usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

/// Where the key set comes from
#[async_trait]
pub trait JwksSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches `GET {url}` and decodes the body as a key set
pub struct HttpJwksSource {
    client: reqwest::Client,
    url: String,
}

impl HttpJwksSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::key_refresh(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(config.jwks_url(), Duration::from_secs(config.jwks_fetch_timeout_secs))
    }
}

#[async_trait]
impl JwksSource for HttpJwksSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::key_refresh(format!("GET {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::key_refresh(format!("GET {} returned {}", self.url, status)));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::key_refresh(format!("invalid key set from {}: {}", self.url, e)))
    }
}

/// Immutable snapshot of usable verification keys, indexed by key ID
pub struct KeySet {
    keys: HashMap<String, Arc<DecodingKey>>,
    refreshed_at: Option<Instant>,
}

impl KeySet {
    fn empty() -> Self {
        Self {
            keys: HashMap::new(),
            refreshed_at: None,
        }
    }

    /// Builds a snapshot from a fetched key set, skipping entries that cannot
    /// be turned into an RSA public key.
    pub fn from_jwks(set: &JwkSet, refreshed_at: Instant) -> Self {
        let mut keys = HashMap::with_capacity(set.keys.len());

        for jwk in &set.keys {
            let Some(kid) = jwk.kid.as_deref().filter(|k| !k.is_empty()) else {
                warn!("Skipping key set entry without kid");
                continue;
            };
            if let Some(kty) = jwk.kty.as_deref() {
                if kty != "RSA" {
                    debug!("Skipping key {} with unsupported kty {}", kid, kty);
                    continue;
                }
            }
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                warn!("Skipping key {}: missing modulus or exponent", kid);
                continue;
            };
            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => {
                    keys.insert(kid.to_string(), Arc::new(key));
                }
                Err(err) => warn!("Skipping key {}: {}", kid, err),
            }
        }

        Self {
            keys,
            refreshed_at: Some(refreshed_at),
        }
    }

    pub fn get(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn refreshed_at(&self) -> Option<Instant> {
        self.refreshed_at
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        match self.refreshed_at {
            Some(at) => at.elapsed() >= ttl,
            None => true,
        }
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("key_ids", &self.key_ids())
            .field("refreshed_at", &self.refreshed_at)
            .finish()
    }
}

/// Process-wide signing key cache with TTL refresh and wholesale replacement
pub struct JwksCache {
    source: Arc<dyn JwksSource>,
    ttl: Duration,
    current: RwLock<Arc<KeySet>>,
    refresh_lock: Mutex<()>,
}

impl JwksCache {
    pub fn new(source: Arc<dyn JwksSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(Arc::new(KeySet::empty())),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The currently published snapshot
    pub async fn snapshot(&self) -> Arc<KeySet> {
        self.current.read().await.clone()
    }

    pub async fn get(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        self.snapshot().await.get(kid)
    }

    pub async fn key_ids(&self) -> Vec<String> {
        self.snapshot().await.key_ids()
    }

    pub async fn refreshed_at(&self) -> Option<Instant> {
        self.snapshot().await.refreshed_at()
    }

    /// True when the cache was never filled or is older than the TTL.
    pub async fn is_stale(&self) -> bool {
        self.snapshot().await.is_stale(self.ttl)
    }

    /// Fetches the full key set and replaces the cache. Returns the number of usable keys.
    ///
    /// A call that had to wait for another fetch which started after this call was
    /// made returns that fetch's result without contacting the provider again.
    pub async fn refresh(&self) -> Result<usize, AuthError> {
        let requested = Instant::now();
        let _guard = self.refresh_lock.lock().await;

        let published = self.snapshot().await;
        if published.refreshed_at.is_some_and(|at| at >= requested) {
            debug!("Reusing key set fetched while waiting for refresh");
            return Ok(published.len());
        }

        self.fetch_and_publish().await
    }

    /// Refreshes only if the cache is still stale once the refresh lock is held.
    async fn refresh_if_stale(&self) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;
        if self.snapshot().await.is_stale(self.ttl) {
            self.fetch_and_publish().await?;
        }
        Ok(())
    }

    // Caller must hold refresh_lock
    async fn fetch_and_publish(&self) -> Result<usize, AuthError> {
        let started = Instant::now();
        let fetched = self.source.fetch().await?;
        let next = Arc::new(KeySet::from_jwks(&fetched, started));
        let count = next.len();
        if next.is_empty() {
            warn!("Signing key set contains no usable keys");
        }

        *self.current.write().await = next;

        debug!("Signing key cache refreshed with {} key(s)", count);
        Ok(count)
    }

    /// Finds the key for `kid`, refreshing when stale and forcing one more
    /// refresh when the key is still unknown.
    pub async fn resolve(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        if self.is_stale().await {
            self.refresh_if_stale().await?;
        }
        if let Some(key) = self.get(kid).await {
            return Ok(key);
        }

        info!("Signing key {} not cached, forcing key set refresh", kid);
        self.refresh().await?;

        self.get(kid)
            .await
            .ok_or_else(|| AuthError::key_resolution(format!("no signing key found for kid {}", kid)))
    }
}
