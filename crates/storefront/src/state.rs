//! The storefront container.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::api::types::{Order, UserProfile};
use crate::auth::{AuthGate, AuthService, AuthState, Redirect};
use crate::cache::{AddressBook, CartCache, WishlistCache};
use crate::catalog::Catalog;
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::error::{AppError, Result};
use crate::session::SessionStore;
use crate::validation::{SignInForm, UpdateProfileForm};

/// Every storefront service wired to one API client and session store.
///
/// This struct is cheaply cloneable via `Arc`. A fresh container starts with
/// empty caches and the gate in `Loading`; call [`Self::mount`] to populate
/// it from the persisted session.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    client: ApiClient,
    store: SessionStore,
    gate: AuthGate,
    auth: AuthService,
    catalog: Catalog<ApiClient>,
    cart: CartCache<ApiClient>,
    wishlist: WishlistCache<ApiClient>,
    addresses: AddressBook<ApiClient>,
    checkout: Checkout<ApiClient, ApiClient>,
}

impl Storefront {
    /// Create a storefront persisting its session to the configured file.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        let store = SessionStore::open(&config.session.path, config.session.cookie_ttl);
        Self::with_session_store(config, store)
    }

    /// Create a storefront over an existing session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_session_store(config: StorefrontConfig, store: SessionStore) -> Result<Self> {
        let client = ApiClient::new(&config.api, store.clone())?;
        let gate = AuthGate::new(store.clone());
        let auth = AuthService::new(client.clone(), store.clone(), gate.clone());
        let catalog = Catalog::new(client.clone(), config.catalog_ttl);
        let cart = CartCache::new(client.clone(), gate.clone());
        let wishlist = WishlistCache::new(client.clone(), gate.clone());
        let addresses = AddressBook::new(client.clone(), gate.clone());
        let checkout = Checkout::new(client.clone(), cart.clone(), config.checkout_return_url.clone());

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                client,
                store,
                gate,
                auth,
                catalog,
                cart,
                wishlist,
                addresses,
                checkout,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.store
    }

    #[must_use]
    pub fn gate(&self) -> &AuthGate {
        &self.inner.gate
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog<ApiClient> {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartCache<ApiClient> {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistCache<ApiClient> {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressBook<ApiClient> {
        &self.inner.addresses
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout<ApiClient, ApiClient> {
        &self.inner.checkout
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Resolve the auth state, then load the cart and wishlist for a signed-in
    /// user. Load failures are logged and left on the caches' error flags.
    #[instrument(skip(self))]
    pub async fn mount(&self) -> AuthState {
        if self.inner.gate.recheck() {
            let (cart, wishlist) =
                tokio::join!(self.inner.cart.fetch(), self.inner.wishlist.fetch());
            for err in [cart.err(), wishlist.err()].into_iter().flatten() {
                self.on_unauthorized(&err);
                err.report();
            }
        }
        self.inner.gate.state()
    }

    /// Rebuild all in-memory state from the persisted session.
    async fn reload(&self) -> AuthState {
        self.inner.cart.reset().await;
        self.inner.wishlist.reset().await;
        self.inner.addresses.reset().await;
        self.inner.catalog.invalidate();
        self.mount().await
    }

    /// Sign in, then reload.
    ///
    /// # Errors
    ///
    /// See [`AuthService::sign_in`].
    pub async fn sign_in(&self, form: &SignInForm) -> Result<Redirect> {
        let redirect = self.inner.auth.sign_in(form).await?;
        self.reload().await;
        Ok(redirect)
    }

    /// Sign out, then reload.
    ///
    /// # Errors
    ///
    /// See [`AuthService::sign_out`].
    pub async fn sign_out(&self) -> Result<Redirect> {
        let redirect = self.inner.auth.sign_out()?;
        self.reload().await;
        Ok(redirect)
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Fail with `Unauthenticated` unless a session token is present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` for signed-out users.
    pub fn require_auth(&self) -> Result<()> {
        if self.inner.gate.is_authenticated() {
            Ok(())
        } else {
            Err(AppError::Unauthenticated)
        }
    }

    /// The signed-in user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when signed out, a session error if
    /// the token does not carry a user id, or the upstream error.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.require_auth()?;
        let token = self.inner.store.token()?.ok_or(AppError::Unauthenticated)?;
        let user = token.user_id()?;
        self.inner
            .client
            .user_orders(&user)
            .await
            .map_err(|e| self.observe(e.into()))
    }

    /// Fetch the profile and keep the stored copy current.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when signed out, or the upstream
    /// error.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile> {
        self.require_auth()?;
        let profile = self
            .inner
            .client
            .me()
            .await
            .map_err(|e| self.observe(e.into()))?;
        self.inner.store.save_user(&profile)?;
        Ok(profile)
    }

    /// Update name, email and phone, then reload the profile.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, `Unauthenticated` when
    /// signed out, or the upstream error.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, form: &UpdateProfileForm) -> Result<UserProfile> {
        form.validate()?;
        self.require_auth()?;
        self.inner
            .client
            .update_profile(form)
            .await
            .map_err(|e| self.observe(e.into()))?;
        info!("Profile updated");
        self.profile().await
    }

    /// Note an upstream rejection of the session token.
    ///
    /// The session is not cleared: the gate keeps reporting signed in until
    /// the user signs out.
    pub fn on_unauthorized(&self, err: &AppError) {
        if err.is_unauthorized() {
            warn!(
                state = ?self.inner.gate.state(),
                error = %err,
                "Upstream rejected the session token; sign out to clear it"
            );
        }
    }

    fn observe(&self, err: AppError) -> AppError {
        self.on_unauthorized(&err);
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use secrecy::SecretString;

    use super::*;
    use crate::auth::RouteDecision;

    fn config() -> StorefrontConfig {
        StorefrontConfig::from_lookup(|key| {
            (key == "BAZAAR_API_BASE_URL").then(|| "http://127.0.0.1:9".to_string())
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_signed_out_mount_makes_no_requests() {
        let store = SessionStore::in_memory(TimeDelta::days(7));
        let storefront = Storefront::with_session_store(config(), store).unwrap();

        assert_eq!(storefront.mount().await, AuthState::Anonymous);
        assert_eq!(storefront.gate().guard(), RouteDecision::Redirect("/sign-in"));
        assert!(storefront.cart().snapshot().await.error.is_none());
        assert!(matches!(
            storefront.orders().await.unwrap_err(),
            AppError::Unauthenticated
        ));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_and_gate() {
        let store = SessionStore::in_memory(TimeDelta::days(7));
        store
            .save_session(&SecretString::from("a.b.c".to_string()), None)
            .unwrap();
        let storefront = Storefront::with_session_store(config(), store.clone()).unwrap();
        storefront.gate().recheck();
        assert!(storefront.gate().is_authenticated());

        let redirect = storefront.sign_out().await.unwrap();
        assert_eq!(redirect, Redirect::Reload("/"));
        assert_eq!(storefront.gate().state(), AuthState::Anonymous);
        assert!(store.token().unwrap().is_none());
        assert_eq!(storefront.gate().guard(), RouteDecision::Redirect("/sign-in"));
    }
}
