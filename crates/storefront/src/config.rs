//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_API_BASE_URL` - Base URL of the upstream storefront API
//!
//! ## Optional
//! - `BAZAAR_SESSION_PATH` - Persisted session file (default: .bazaar/session.json)
//! - `BAZAAR_COOKIE_TTL_DAYS` - Lifetime of the token cookie (default: 7)
//! - `BAZAAR_CATALOG_TTL_SECS` - Product catalog cache TTL (default: 300)
//! - `BAZAAR_REQUEST_TIMEOUT_SECS` - Upstream request timeout (default: 30)
//! - `BAZAAR_CHECKOUT_RETURN_URL` - Origin the hosted card checkout returns to
//!   (default: <http://localhost:3000>)
//! - `BAZAAR_PAGE_SIZE` - Products per catalog page (default: 12)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
///
/// Implements `Debug` manually to redact the Sentry DSN.
#[derive(Clone)]
pub struct StorefrontConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    /// How long the product catalog stays cached
    pub catalog_ttl: Duration,
    /// Default number of products per catalog page
    pub page_size: NonZeroUsize,
    /// Origin passed to the hosted card checkout
    pub checkout_return_url: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<SecretString>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Upstream API connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every resource path is resolved against
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Persisted client state settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// JSON file holding the cookie and local storage entries
    pub path: PathBuf,
    /// Fixed lifetime of the token cookie
    pub cookie_ttl: TimeDelta,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api", &self.api)
            .field("session", &self.session)
            .field("catalog_ttl", &self.catalog_ttl)
            .field("page_size", &self.page_size)
            .field("checkout_return_url", &self.checkout_return_url)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let base_url = parse_base_url("BAZAAR_API_BASE_URL", &env.required("BAZAAR_API_BASE_URL")?)?;
        let timeout = Duration::from_secs(env.parsed("BAZAAR_REQUEST_TIMEOUT_SECS", 30)?);

        let path = PathBuf::from(env.or_default("BAZAAR_SESSION_PATH", ".bazaar/session.json"));
        let ttl_days: i64 = env.parsed("BAZAAR_COOKIE_TTL_DAYS", 7)?;
        let cookie_ttl = TimeDelta::try_days(ttl_days)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "BAZAAR_COOKIE_TTL_DAYS".to_string(),
                    format!("{ttl_days} is not a positive number of days"),
                )
            })?;

        let catalog_ttl = Duration::from_secs(env.parsed("BAZAAR_CATALOG_TTL_SECS", 300)?);
        let page_size: NonZeroUsize = env.parsed(
            "BAZAAR_PAGE_SIZE",
            crate::catalog::DEFAULT_PAGE_SIZE,
        )?;

        let checkout_return_url = env.or_default("BAZAAR_CHECKOUT_RETURN_URL", "http://localhost:3000");
        parse_base_url("BAZAAR_CHECKOUT_RETURN_URL", &checkout_return_url)?;

        Ok(Self {
            api: ApiConfig { base_url, timeout },
            session: SessionConfig { path, cookie_ttl },
            catalog_ttl,
            page_size,
            checkout_return_url,
            sentry_dsn: env.optional("SENTRY_DSN").map(SecretString::from),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Parse an absolute http(s) URL.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("BAZAAR_API_BASE_URL", "https://api.example.com/api/v1")]).unwrap();

        assert_eq!(config.api.base_url.as_str(), "https://api.example.com/api/v1");
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.session.path, PathBuf::from(".bazaar/session.json"));
        assert_eq!(config.session.cookie_ttl, TimeDelta::days(7));
        assert_eq!(config.catalog_ttl, Duration::from_secs(300));
        assert_eq!(config.page_size.get(), 12);
        assert_eq!(config.checkout_return_url, "http://localhost:3000");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "BAZAAR_API_BASE_URL"));

        let err = load(&[("BAZAAR_API_BASE_URL", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("BAZAAR_API_BASE_URL", "ftp://api.example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        let err = load(&[
            ("BAZAAR_API_BASE_URL", "https://api.example.com"),
            ("BAZAAR_PAGE_SIZE", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "BAZAAR_PAGE_SIZE"));

        let err = load(&[
            ("BAZAAR_API_BASE_URL", "https://api.example.com"),
            ("BAZAAR_COOKIE_TTL_DAYS", "-1"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BAZAAR_API_BASE_URL", "http://127.0.0.1:8080"),
            ("BAZAAR_SESSION_PATH", "/tmp/bazaar.json"),
            ("BAZAAR_COOKIE_TTL_DAYS", "1"),
            ("BAZAAR_PAGE_SIZE", "24"),
            ("BAZAAR_REQUEST_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.session.path, PathBuf::from("/tmp/bazaar.json"));
        assert_eq!(config.session.cookie_ttl, TimeDelta::days(1));
        assert_eq!(config.page_size.get(), 24);
        assert_eq!(config.api.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_debug_redacts_sentry_dsn() {
        let config = load(&[
            ("BAZAAR_API_BASE_URL", "https://api.example.com"),
            ("SENTRY_DSN", "https://abc123secret@o1.ingest.sentry.io/42"),
        ])
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("abc123secret"));
    }
}
