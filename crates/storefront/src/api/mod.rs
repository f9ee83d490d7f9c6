//! Client for the upstream storefront REST API.
//!
//! # Architecture
//!
//! - One shared `reqwest::Client` behind an `Arc`; clones are cheap
//! - The session token is read from the [`SessionStore`] cookie at send time
//!   and attached in the `token` header, so sign-in and sign-out take effect
//!   on the next request without rebuilding the client
//! - Raw bodies ([`wire`]) are converted into canonical [`types`] by
//!   [`conversions`]; nothing else in the crate sees upstream JSON
//! - No automatic retry
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api, session.clone())?;
//!
//! let page = client.list_products().await?;
//! let cart = client.add_to_cart(&page.products[0].id).await?;
//! ```

mod auth;
mod cart;
pub mod conversions;
mod orders;
mod products;
mod profile;
pub mod types;
pub mod wire;
mod wishlist;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::session::SessionStore;

pub use types::*;

/// Header carrying the session token on every request.
pub const TOKEN_HEADER: &str = "token";

/// Error-message fragments the upstream uses when a user has no cart yet.
const NO_CART_PATTERNS: &[&str] = &["no cart", "cart not found", "there is no cart"];

/// Errors that can occur when talking to the upstream API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The session token was missing, expired or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the upstream.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The response parsed but lacked a required field.
    #[error("Response missing {0}")]
    MissingData(&'static str),
}

impl ApiError {
    /// The message reported by the upstream, if any.
    #[must_use]
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(message)
            | Self::NotFound(message)
            | Self::Status { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Whether this is the upstream's "this user has no cart yet" answer.
    ///
    /// That answer is an expected empty state, not a failure.
    #[must_use]
    pub fn is_no_cart(&self) -> bool {
        self.upstream_message().is_some_and(|message| {
            let message = message.to_lowercase();
            NO_CART_PATTERNS.iter().any(|pattern| message.contains(pattern))
        })
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether this error indicates a fault on the upstream side rather than
    /// a problem with the request.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Parse(_) | Self::MissingData(_) => true,
            _ => false,
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the upstream storefront API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: SessionStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client reading its token from `session`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bazaar/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                session,
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an API path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))?)
    }

    /// Start a request with the session token attached.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match self.inner.session.cookie_token() {
            Ok(Some(token)) => builder.header(TOKEN_HEADER, token.expose_secret()),
            Ok(None) => builder,
            Err(e) => {
                warn!(error = %e, "Could not read session token, sending request without it");
                builder
            }
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        let message = conversions::extract_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Upstream API returned server error"
            );
        } else {
            debug!(status = %status, message = %message, "Upstream API rejected request");
        }

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// Send a request and parse the JSON body.
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse upstream response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose response body is not needed.
    async fn execute_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.send(builder).await.map(drop)
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(Method::GET, self.endpoint(path)?))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(Method::POST, self.endpoint(path)?))
    }

    fn put(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(Method::PUT, self.endpoint(path)?))
    }

    fn delete(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(Method::DELETE, self.endpoint(path)?))
    }
}

/// Percent-encode a single path segment.
fn segment(raw: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(raw)
}
