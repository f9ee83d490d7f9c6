//! Integration tests for the auth gate, route guards and the sign-in /
//! sign-out reload cycle.

use bazaar_core::ProductId;
use bazaar_integration_tests::{MockUpstream, SHOPPER_ID, SHOPPER_NAME};
use bazaar_storefront::AppError;
use bazaar_storefront::auth::{AuthState, HOME_ROUTE, Redirect, RouteDecision, SIGN_IN_ROUTE};
use bazaar_storefront::session::SessionStore;
use bazaar_storefront::validation::SignUpForm;
use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};

async fn upstream() -> MockUpstream {
    MockUpstream::start().await.expect("Failed to start mock upstream")
}

// ============================================================================
// Gate
// ============================================================================

#[tokio::test]
async fn test_gate_loading_until_mounted() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    assert_eq!(storefront.gate().state(), AuthState::Loading);
    assert_eq!(storefront.gate().guard(), RouteDecision::Wait);

    assert_eq!(storefront.mount().await, AuthState::Anonymous);
    assert_eq!(
        storefront.gate().guard(),
        RouteDecision::Redirect(SIGN_IN_ROUTE)
    );
}

#[tokio::test]
async fn test_sign_in_reloads_and_loads_caches() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");
    storefront.mount().await;

    let redirect = storefront
        .sign_in(&MockUpstream::shopper_sign_in())
        .await
        .expect("sign in");

    assert_eq!(redirect, Redirect::Reload(HOME_ROUTE));
    assert_eq!(storefront.gate().state(), AuthState::Authenticated);
    assert_eq!(storefront.gate().guard(), RouteDecision::Render);

    let requests = upstream.requests();
    assert!(requests.iter().any(|r| r.is("GET", "/cart")));
    assert!(requests.iter().any(|r| r.is("GET", "/wishlist")));

    let user = storefront.session().user().expect("read user").expect("user");
    assert_eq!(user.name, SHOPPER_NAME);
}

#[tokio::test]
async fn test_token_claims_name_the_user() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");
    storefront
        .sign_in(&MockUpstream::shopper_sign_in())
        .await
        .expect("sign in");

    let token = storefront
        .session()
        .token()
        .expect("read token")
        .expect("token");
    let claims = token.claims().expect("claims");
    assert_eq!(claims.user_id.as_ref().map(|id| id.as_str()), Some(SHOPPER_ID));
    assert_eq!(claims.role.as_deref(), Some("user"));
    assert!(!claims.is_expired(chrono::Utc::now()));
}

#[tokio::test]
async fn test_session_survives_restart() {
    let upstream = upstream().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("session.json");

    let first = upstream
        .storefront_with(SessionStore::open(&path, TimeDelta::days(7)))
        .expect("storefront");
    first
        .sign_in(&MockUpstream::shopper_sign_in())
        .await
        .expect("sign in");
    first
        .cart()
        .add_item(&ProductId::new("p1"))
        .await
        .expect("add");
    drop(first);

    let second = upstream
        .storefront_with(SessionStore::open(&path, TimeDelta::days(7)))
        .expect("storefront");
    assert_eq!(second.mount().await, AuthState::Authenticated);
    assert_eq!(second.cart().item_count().await, 1);
}

#[tokio::test]
async fn test_sign_out_clears_session_and_caches() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");
    storefront
        .sign_in(&MockUpstream::shopper_sign_in())
        .await
        .expect("sign in");
    storefront
        .cart()
        .add_item(&ProductId::new("p1"))
        .await
        .expect("add");
    upstream.clear_requests();

    let redirect = storefront.sign_out().await.expect("sign out");

    assert!(redirect.requires_reload());
    assert_eq!(storefront.gate().state(), AuthState::Anonymous);
    assert!(storefront.session().token().expect("read token").is_none());
    assert!(storefront.session().user().expect("read user").is_none());
    assert!(storefront.cart().cart().await.is_none());
    assert!(upstream.requests().is_empty());

    // The server still holds the cart for the next sign-in.
    assert!(upstream.has_cart(SHOPPER_ID));
}

#[tokio::test]
async fn test_preissued_token_is_honoured() {
    let upstream = upstream().await;
    let store = SessionStore::in_memory(TimeDelta::days(7));
    let token = SecretString::from(upstream.issue_token(SHOPPER_ID));
    store.save_session(&token, None).expect("save session");

    let storefront = upstream.storefront_with(store).expect("storefront");
    assert_eq!(storefront.mount().await, AuthState::Authenticated);

    let sent = upstream
        .requests()
        .iter()
        .find(|r| r.is("GET", "/cart"))
        .and_then(|r| r.token.clone());
    assert_eq!(sent.as_deref(), Some(token.expose_secret()));
}

// ============================================================================
// Protected Operations
// ============================================================================

#[tokio::test]
async fn test_orders_require_sign_in() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");
    storefront.mount().await;

    let err = storefront.orders().await.expect_err("signed out");

    assert!(matches!(err, AppError::Unauthenticated));
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_profile_is_cached_after_fetch() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");
    storefront
        .sign_in(&MockUpstream::shopper_sign_in())
        .await
        .expect("sign in");

    let profile = storefront.profile().await.expect("profile");
    assert_eq!(profile.email, "shopper@example.com");
    assert_eq!(profile.phone.as_deref(), Some("01012345678"));

    let cached = storefront.session().user().expect("read user").expect("user");
    assert_eq!(cached, profile);
}

#[tokio::test]
async fn test_register_then_sign_in() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    let form = SignUpForm {
        name: "Nora Newcomer".to_string(),
        email: "nora@example.com".to_string(),
        password: SecretString::from("hunter22"),
        re_password: SecretString::from("hunter22"),
        phone: "01198765432".to_string(),
    };
    let redirect = storefront.auth().register(&form).await.expect("register");
    assert_eq!(redirect, Redirect::Navigate(SIGN_IN_ROUTE));
    assert!(!storefront.gate().is_authenticated());

    let again = storefront.auth().register(&form).await.expect_err("duplicate");
    assert_eq!(again.user_message("Registration failed"), "Account Already Exists");
}
