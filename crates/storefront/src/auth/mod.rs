//! Authentication: the auth gate, route guards, and account flows.
//!
//! # Reload contract
//!
//! Signing in or out persists (or removes) the token and then returns
//! [`Redirect::Reload`]. The caller must rebuild every in-memory cache from
//! the new persisted state, exactly as a full page reload would; the caches
//! themselves never watch for auth changes.

pub mod gate;
pub mod guard;

pub use gate::AuthGate;
pub use guard::{
    AUTH_PATHS, HOME_ROUTE, RouteDecision, SIGN_IN_ROUTE, guard_auth_page, guard_protected,
    is_auth_path,
};

use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::api::types::AuthTokens;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::session::{SessionStore, SessionToken};
use crate::validation::{
    ChangePasswordForm, ForgotPasswordForm, ResetPasswordForm, SignInForm, SignUpForm,
    VerifyCodeForm,
};

pub const VERIFY_CODE_ROUTE: &str = "/verify-code";
pub const RESET_PASSWORD_ROUTE: &str = "/reset-password";

/// Resolved authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    /// Not yet read from storage.
    Loading,
    Authenticated,
    Anonymous,
}

/// Where to go after an account flow completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// Client-side navigation; caches stay as they are.
    Navigate(&'static str),
    /// Navigate and rebuild all in-memory state from storage.
    Reload(&'static str),
}

impl Redirect {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Navigate(path) | Self::Reload(path) => path,
        }
    }

    #[must_use]
    pub const fn requires_reload(self) -> bool {
        matches!(self, Self::Reload(_))
    }
}

/// Account flows: registration, sign-in/out, and password recovery.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
    store: SessionStore,
    gate: AuthGate,
}

impl AuthService {
    #[must_use]
    pub const fn new(client: ApiClient, store: SessionStore, gate: AuthGate) -> Self {
        Self {
            client,
            store,
            gate,
        }
    }

    /// Persist a freshly issued session and flip the gate.
    fn establish(&self, tokens: &AuthTokens) -> Result<()> {
        self.store.save_session(&tokens.token, tokens.user.as_ref())?;
        self.gate.recheck();

        let token = SessionToken::from(tokens.token.clone());
        let email = tokens.user.as_ref().map(|u| u.email.as_str());
        if let Ok(user_id) = token.user_id() {
            set_sentry_user(&user_id, email);
        }
        Ok(())
    }

    /// Register an account. The user must sign in afterwards.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the upstream error.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &SignUpForm) -> Result<Redirect> {
        form.validate()?;
        self.client.register(form).await?;
        info!("Registration successful");
        Ok(Redirect::Navigate(SIGN_IN_ROUTE))
    }

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, the upstream error, or
    /// a storage error if the session cannot be persisted.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, form: &SignInForm) -> Result<Redirect> {
        form.validate()?;
        let tokens = self.client.sign_in(form).await?;
        self.establish(&tokens)?;
        add_breadcrumb("auth", "Signed in", None);
        info!("Login successful");
        Ok(Redirect::Reload(HOME_ROUTE))
    }

    /// Remove the session from both stores.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be removed.
    #[instrument(skip_all)]
    pub fn sign_out(&self) -> Result<Redirect> {
        self.store.clear()?;
        self.gate.recheck();
        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
        info!("Signed out");
        Ok(Redirect::Reload(HOME_ROUTE))
    }

    /// Request a reset code by email.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the upstream error.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, form: &ForgotPasswordForm) -> Result<Redirect> {
        form.validate()?;
        self.client.forgot_password(form).await?;
        Ok(Redirect::Navigate(VERIFY_CODE_ROUTE))
    }

    /// Verify an emailed reset code.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the upstream error.
    #[instrument(skip_all)]
    pub async fn verify_reset_code(&self, form: &VerifyCodeForm) -> Result<Redirect> {
        form.validate()?;
        self.client.verify_reset_code(form).await?;
        Ok(Redirect::Navigate(RESET_PASSWORD_ROUTE))
    }

    /// Set a new password. Signs the user in when the upstream issues a
    /// token, otherwise sends them to sign in.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the upstream error.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, form: &ResetPasswordForm) -> Result<Redirect> {
        form.validate()?;
        match self.client.reset_password(form).await? {
            Some(tokens) => {
                self.establish(&tokens)?;
                Ok(Redirect::Reload(HOME_ROUTE))
            }
            None => Ok(Redirect::Navigate(SIGN_IN_ROUTE)),
        }
    }

    /// Change the password, keeping the session. A rotated token replaces
    /// the stored one.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the upstream error.
    #[instrument(skip_all)]
    pub async fn change_password(&self, form: &ChangePasswordForm) -> Result<()> {
        form.validate()?;
        if let Some(mut tokens) = self.client.change_password(form).await? {
            if tokens.user.is_none() {
                tokens.user = self.store.user()?;
            }
            self.establish(&tokens)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_accessors() {
        assert_eq!(Redirect::Reload("/").path(), "/");
        assert!(Redirect::Reload("/").requires_reload());
        assert!(!Redirect::Navigate("/sign-in").requires_reload());
    }
}
