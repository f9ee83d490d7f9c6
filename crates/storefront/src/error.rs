//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for every storefront operation. Errors
//! are recovered locally: callers show [`AppError::user_message`] and carry
//! on. Faults on the upstream side or in local storage are captured to Sentry
//! via [`AppError::report`].

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::validation::ValidationErrors;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Upstream API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Form input failed client-side validation. No request was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Persisted session state could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    Unauthenticated,

    /// Checkout was attempted with no items in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Resource not found locally.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Checkout could not be completed.
    #[error("Checkout error: {0}")]
    Checkout(String),
}

impl AppError {
    /// Short message suitable for showing to the user.
    ///
    /// Prefers the message the upstream reported; falls back to `fallback`
    /// (e.g. "Failed to add product to cart") when there is none.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(ApiError::RateLimited(secs)) => {
                format!("Too many requests, try again in {secs} seconds")
            }
            Self::Api(err) => err
                .upstream_message()
                .map_or_else(|| fallback.to_string(), str::to_string),
            Self::Validation(errors) => errors
                .first_message()
                .map_or_else(|| fallback.to_string(), str::to_string),
            Self::Unauthenticated => "Please sign in to continue".to_string(),
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::Checkout(message) => message.clone(),
            Self::NotFound(_) => self.to_string(),
            Self::Session(_) | Self::Config(_) => fallback.to_string(),
        }
    }

    /// Whether the upstream rejected the session token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_unauthorized())
    }

    /// Whether this error is worth capturing: a fault upstream or in local
    /// storage rather than a user mistake or an expected rejection.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Api(err) => err.is_server_error(),
            Self::Session(_) | Self::Config(_) => true,
            _ => false,
        }
    }

    /// Capture reportable errors to Sentry and log them.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Storefront operation failed");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "6428ebc6")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::Checkout("no session url".to_string());
        assert_eq!(err.to_string(), "Checkout error: no session url");
    }

    #[test]
    fn test_user_message_prefers_upstream() {
        let err = AppError::from(ApiError::Status {
            status: 400,
            message: "Invalid phone".to_string(),
        });
        assert_eq!(err.user_message("Failed to add address"), "Invalid phone");

        let err = AppError::from(ApiError::MissingData("cart id"));
        assert_eq!(
            err.user_message("Failed to add product to cart"),
            "Failed to add product to cart"
        );
    }

    #[test]
    fn test_user_message_for_local_errors() {
        assert_eq!(
            AppError::Unauthenticated.user_message("x"),
            "Please sign in to continue"
        );
        assert_eq!(AppError::EmptyCart.user_message("x"), "Your cart is empty");
        let err = AppError::from(ValidationErrors::single("city", "City is required"));
        assert_eq!(err.user_message("x"), "City is required");
    }

    #[test]
    fn test_reportable_classification() {
        assert!(
            AppError::from(ApiError::Status {
                status: 500,
                message: String::new()
            })
            .is_reportable()
        );
        assert!(!AppError::from(ApiError::Unauthorized("expired".into())).is_reportable());
        assert!(!AppError::EmptyCart.is_reportable());
        assert!(AppError::from(ApiError::Unauthorized("expired".into())).is_unauthorized());
    }
}
