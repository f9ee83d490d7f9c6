//! Integration tests for the upstream API client: token header injection,
//! response normalization and error surfacing.

use bazaar_core::{Price, ProductId};
use bazaar_integration_tests::{MockUpstream, SHOPPER_ID};
use bazaar_storefront::AppError;
use bazaar_storefront::api::ApiError;
use bazaar_storefront::validation::SignInForm;
use rust_decimal::Decimal;
use secrecy::SecretString;

async fn upstream() -> MockUpstream {
    MockUpstream::start().await.expect("Failed to start mock upstream")
}

// ============================================================================
// Token Header
// ============================================================================

#[tokio::test]
async fn test_signed_out_requests_carry_no_token() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    storefront.catalog().products().await.expect("products");

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests.iter().all(|r| r.token.is_none()));
}

#[tokio::test]
async fn test_signed_in_requests_carry_session_token() {
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
        .expect("add to cart");

    let tokens = upstream.tokens_of(SHOPPER_ID);
    assert_eq!(tokens.len(), 1);
    let issued = tokens.first().cloned();

    let requests = upstream.requests();
    let sign_in = requests
        .iter()
        .find(|r| r.is("POST", "/auth/signin"))
        .expect("sign-in request");
    assert!(sign_in.token.is_none());

    let after: Vec<_> = requests
        .iter()
        .filter(|r| !r.is("POST", "/auth/signin"))
        .collect();
    assert!(after.iter().any(|r| r.is("POST", "/cart")));
    assert!(after.iter().all(|r| r.token == issued));
}

#[tokio::test]
async fn test_token_stops_after_sign_out() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    storefront
        .sign_in(&MockUpstream::shopper_sign_in())
        .await
        .expect("sign in");
    storefront.sign_out().await.expect("sign out");
    upstream.clear_requests();

    storefront.catalog().products().await.expect("products");

    assert!(upstream.requests().iter().all(|r| r.token.is_none()));
}

// ============================================================================
// Normalization
// ============================================================================

#[tokio::test]
async fn test_products_normalized_across_id_shapes() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    let products = storefront.catalog().products().await.expect("products");
    assert_eq!(products.len(), 4);

    let shirt = products
        .iter()
        .find(|p| p.id.as_str() == "p1")
        .expect("shirt");
    assert!(shirt.alt_id.is_none());

    let boots = products
        .iter()
        .find(|p| p.id.as_str() == "p2")
        .expect("boots");
    assert_eq!(boots.alt_id.as_ref().map(ProductId::as_str), Some("legacy-2"));
    assert_eq!(boots.effective_price(), Price::from_units(65));
    assert!(boots.is_discounted());

    let mouse = products
        .iter()
        .find(|p| p.title == "Wireless Mouse")
        .expect("mouse");
    assert_eq!(mouse.id.as_str(), "p3");
    assert_eq!(mouse.sold, None);

    let lamp = products
        .iter()
        .find(|p| p.id.as_str() == "p4")
        .expect("lamp");
    assert!(lamp.brand.is_none());
    assert!((lamp.ratings_average - 0.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_product_lookup_by_alternate_id_uses_cached_list() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    storefront.catalog().products().await.expect("products");
    let boots = storefront
        .catalog()
        .product(&ProductId::new("legacy-2"))
        .await
        .expect("product");

    assert_eq!(boots.title, "Leather Boots");
    assert!(
        !upstream
            .requests()
            .iter()
            .any(|r| r.path.starts_with("/products/"))
    );
}

#[tokio::test]
async fn test_product_lookup_falls_back_to_upstream() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    let lamp = storefront
        .catalog()
        .product(&ProductId::new("p4"))
        .await
        .expect("product");
    assert_eq!(lamp.price, Price::usd(Decimal::from(120)));

    storefront
        .catalog()
        .product(&ProductId::new("p4"))
        .await
        .expect("cached product");
    let fetched = upstream
        .requests()
        .iter()
        .filter(|r| r.is("GET", "/products/p4"))
        .count();
    assert_eq!(fetched, 1);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_rejected_sign_in_surfaces_upstream_message() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    let form = SignInForm {
        email: "shopper@example.com".to_string(),
        password: SecretString::from("wrong-password"),
    };
    let err = storefront.sign_in(&form).await.expect_err("should be rejected");

    assert!(matches!(&err, AppError::Api(ApiError::Unauthorized(_))));
    assert_eq!(err.user_message("Login failed"), "Incorrect email or password");
    assert!(!storefront.gate().is_authenticated());
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    let err = storefront
        .catalog()
        .product(&ProductId::new("missing"))
        .await
        .expect_err("should be missing");

    assert!(matches!(err, AppError::Api(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_form_sends_no_request() {
    let upstream = upstream().await;
    let storefront = upstream.storefront().expect("storefront");

    let form = SignInForm {
        email: "not-an-email".to_string(),
        password: SecretString::from("secret123"),
    };
    let err = storefront.sign_in(&form).await.expect_err("should fail validation");

    assert!(matches!(err, AppError::Validation(_)));
    assert!(upstream.requests().is_empty());
}
