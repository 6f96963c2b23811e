use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Settings for verifying bearer tokens issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub instance_domain: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub jwks_cache_expiration_seconds: u64,
    pub expiration_leeway_seconds: u64,
    pub jwks_fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub reactivation_interval_secs: u64,
}

impl AuthConfig {
    pub const DEFAULT_JWKS_CACHE_EXPIRATION_SECONDS: u64 = 3600;

    pub fn new(instance_domain: impl Into<String>) -> Self {
        Self {
            instance_domain: instance_domain.into(),
            issuer: None,
            audience: None,
            jwks_cache_expiration_seconds: Self::DEFAULT_JWKS_CACHE_EXPIRATION_SECONDS,
            expiration_leeway_seconds: 0,
            jwks_fetch_timeout_secs: 10,
        }
    }

    /// Well-known key set location for the configured instance.
    /// Accepts a bare host as well as a host with scheme or trailing slash.
    pub fn jwks_url(&self) -> String {
        let domain = self
            .instance_domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("https://{}/.well-known/jwks.json", domain)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance_domain.trim().is_empty() {
            return Err(ConfigError::Missing("AUTH_INSTANCE_DOMAIN"));
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Auth overrides
        if let Ok(v) = env::var("AUTH_INSTANCE_DOMAIN") {
            self.auth.instance_domain = v.trim().to_string();
        }
        if let Ok(v) = env::var("AUTH_ISSUER") {
            self.auth.issuer = non_empty(v);
        }
        if let Ok(v) = env::var("AUTH_AUDIENCE") {
            self.auth.audience = non_empty(v);
        }
        if let Ok(v) = env::var("AUTH_JWKS_CACHE_EXPIRATION_SECONDS") {
            self.auth.jwks_cache_expiration_seconds =
                v.parse().unwrap_or(self.auth.jwks_cache_expiration_seconds);
        }
        if let Ok(v) = env::var("AUTH_EXPIRATION_LEEWAY_SECONDS") {
            self.auth.expiration_leeway_seconds = v.parse().unwrap_or(self.auth.expiration_leeway_seconds);
        }
        if let Ok(v) = env::var("AUTH_JWKS_FETCH_TIMEOUT_SECS") {
            self.auth.jwks_fetch_timeout_secs = v.parse().unwrap_or(self.auth.jwks_fetch_timeout_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Scheduler overrides
        if let Ok(v) = env::var("SCHEDULER_ENABLED") {
            self.scheduler.enabled = v.parse().unwrap_or(self.scheduler.enabled);
        }
        if let Ok(v) = env::var("SCHEDULER_REACTIVATION_INTERVAL_SECS") {
            self.scheduler.reactivation_interval_secs =
                v.parse().unwrap_or(self.scheduler.reactivation_interval_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            auth: AuthConfig::new(""),
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                reactivation_interval_secs: 60 * 60,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            auth: AuthConfig {
                jwks_fetch_timeout_secs: 5,
                ..AuthConfig::new("")
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                reactivation_interval_secs: 60 * 60,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            auth: AuthConfig {
                jwks_fetch_timeout_secs: 5,
                ..AuthConfig::new("")
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                reactivation_interval_secs: 24 * 60 * 60, // daily
            },
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.auth.jwks_cache_expiration_seconds, 3600);
        assert_eq!(config.auth.expiration_leeway_seconds, 0);
        assert!(config.auth.issuer.is_none());
        assert!(config.scheduler.enabled);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.scheduler.reactivation_interval_secs, 86_400);
    }

    #[test]
    fn jwks_url_normalises_domain() {
        assert_eq!(
            AuthConfig::new("clerk.example.com").jwks_url(),
            "https://clerk.example.com/.well-known/jwks.json"
        );
        assert_eq!(
            AuthConfig::new("https://clerk.example.com/").jwks_url(),
            "https://clerk.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn missing_instance_domain_is_rejected() {
        assert!(matches!(
            AuthConfig::new("  ").validate(),
            Err(ConfigError::Missing("AUTH_INSTANCE_DOMAIN"))
        ));
        assert!(AuthConfig::new("clerk.example.com").validate().is_ok());
    }

    #[test]
    fn blank_overrides_become_none() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty(" aud ".to_string()), Some("aud".to_string()));
    }
}
