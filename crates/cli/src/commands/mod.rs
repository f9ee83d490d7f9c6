//! Subcommand implementations.
//!
//! Output goes through `tracing::info!` so it shares the subscriber (and the
//! Sentry breadcrumb trail) with library logging.

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod profile;
pub mod wishlist;

use bazaar_storefront::auth::RouteDecision;
use bazaar_storefront::{AppError, Storefront};

/// Resolve the session and refuse protected commands for signed-out users.
fn protected(storefront: &Storefront) -> Result<(), AppError> {
    storefront.gate().recheck();
    match storefront.gate().guard() {
        RouteDecision::Render => Ok(()),
        RouteDecision::Wait | RouteDecision::Redirect(_) => Err(AppError::Unauthenticated),
    }
}
