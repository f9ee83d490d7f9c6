//! Route decisions for protected pages and auth pages.

use super::AuthState;

pub const HOME_ROUTE: &str = "/";
pub const SIGN_IN_ROUTE: &str = "/sign-in";

/// Pages that make no sense for a signed-in user.
pub const AUTH_PATHS: &[&str] = &[
    "/sign-in",
    "/sign-up",
    "/forgot-password",
    "/reset-password",
    "/verify-code",
];

/// What to do with a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Show the page.
    Render,
    /// Auth state is still being resolved; show nothing yet.
    Wait,
    /// Send the user elsewhere.
    Redirect(&'static str),
}

/// Whether `path` is an auth page or below one.
#[must_use]
pub fn is_auth_path(path: &str) -> bool {
    AUTH_PATHS.iter().any(|auth| {
        path.strip_prefix(auth)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Guard for pages that require a signed-in user.
///
/// Never redirects while the state is still loading.
#[must_use]
pub const fn guard_protected(state: AuthState) -> RouteDecision {
    match state {
        AuthState::Loading => RouteDecision::Wait,
        AuthState::Authenticated => RouteDecision::Render,
        AuthState::Anonymous => RouteDecision::Redirect(SIGN_IN_ROUTE),
    }
}

/// Request-level guard keeping signed-in users off auth pages.
///
/// Runs before any page state exists, so it only looks at the cookie.
#[must_use]
pub fn guard_auth_page(path: &str, has_cookie_token: bool) -> RouteDecision {
    if has_cookie_token && is_auth_path(path) {
        RouteDecision::Redirect(HOME_ROUTE)
    } else {
        RouteDecision::Render
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_paths_and_subpaths() {
        assert!(is_auth_path("/sign-in"));
        assert!(is_auth_path("/verify-code/step-2"));
        assert!(!is_auth_path("/sign-inx"));
        assert!(!is_auth_path("/cart"));
        assert!(!is_auth_path("/"));
    }

    #[test]
    fn test_guard_protected_waits_while_loading() {
        assert_eq!(guard_protected(AuthState::Loading), RouteDecision::Wait);
        assert_eq!(guard_protected(AuthState::Authenticated), RouteDecision::Render);
        assert_eq!(
            guard_protected(AuthState::Anonymous),
            RouteDecision::Redirect("/sign-in")
        );
    }

    #[test]
    fn test_guard_auth_page() {
        assert_eq!(guard_auth_page("/sign-up", true), RouteDecision::Redirect("/"));
        assert_eq!(guard_auth_page("/sign-up", false), RouteDecision::Render);
        assert_eq!(guard_auth_page("/products", true), RouteDecision::Render);
    }
}
