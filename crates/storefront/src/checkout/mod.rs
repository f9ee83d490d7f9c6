//! Placing orders from the cached cart.

pub mod summary;

pub use summary::{FLAT_SHIPPING, FREE_SHIPPING_THRESHOLD, OrderSummary, TAX_RATE_PERCENT};

use std::future::Future;
use std::sync::Arc;

use bazaar_core::{CartId, PaymentMethod};
use tracing::{info, instrument, warn};

use crate::api::types::{Address, CheckoutSession, Order, ShippingAddress};
use crate::api::{ApiClient, ApiError};
use crate::cache::{CartBackend, CartCache};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::validation::ValidationErrors;

/// Order operations checkout needs from the upstream.
pub trait OrderBackend: Send + Sync + 'static {
    fn create_cash_order(
        &self,
        cart: &CartId,
        shipping: &ShippingAddress,
    ) -> impl Future<Output = std::result::Result<Order, ApiError>> + Send;

    fn create_checkout_session(
        &self,
        cart: &CartId,
        return_url: &str,
    ) -> impl Future<Output = std::result::Result<CheckoutSession, ApiError>> + Send;
}

impl OrderBackend for ApiClient {
    fn create_cash_order(
        &self,
        cart: &CartId,
        shipping: &ShippingAddress,
    ) -> impl Future<Output = std::result::Result<Order, ApiError>> + Send {
        Self::create_cash_order(self, cart, shipping)
    }

    fn create_checkout_session(
        &self,
        cart: &CartId,
        return_url: &str,
    ) -> impl Future<Output = std::result::Result<CheckoutSession, ApiError>> + Send {
        Self::create_checkout_session(self, cart, return_url)
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// A cash order was placed.
    Placed(Order),
    /// Card payment continues on the hosted checkout page at this URL.
    Redirect(String),
}

/// The saved address preselected at checkout: the first one.
#[must_use]
pub fn default_shipping(addresses: &[Address]) -> Option<ShippingAddress> {
    addresses.first().map(ShippingAddress::from)
}

pub struct Checkout<O, C> {
    inner: Arc<CheckoutInner<O, C>>,
}

struct CheckoutInner<O, C> {
    orders: O,
    cart: CartCache<C>,
    return_url: String,
}

impl<O, C> Clone for Checkout<O, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: OrderBackend, C: CartBackend> Checkout<O, C> {
    /// `return_url` is the origin the hosted card checkout returns to.
    #[must_use]
    pub fn new(orders: O, cart: CartCache<C>, return_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CheckoutInner {
                orders,
                cart,
                return_url: return_url.into(),
            }),
        }
    }

    /// Summary of the cached cart, if there is one.
    pub async fn summary(&self) -> Option<OrderSummary> {
        self.inner.cart.cart().await.as_ref().map(OrderSummary::for_cart)
    }

    /// Place an order for the cached cart.
    ///
    /// Cash orders are created directly and the cart is reloaded, since the
    /// server consumes it. Card orders open a hosted checkout session and
    /// return its URL; the cart stays until payment completes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::EmptyCart` for a missing or empty cart, a
    /// validation error if any shipping field is blank, the upstream error,
    /// or `AppError::Checkout` when the session comes back without a URL.
    #[instrument(skip(self, shipping), fields(method = %method))]
    pub async fn place_order(
        &self,
        method: PaymentMethod,
        shipping: &ShippingAddress,
    ) -> Result<CheckoutOutcome> {
        let cart = self
            .inner
            .cart
            .cart()
            .await
            .filter(|cart| !cart.is_empty())
            .ok_or(AppError::EmptyCart)?;

        if [&shipping.details, &shipping.phone, &shipping.city]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ValidationErrors::single("shipping_address", "Please fill in all fields").into());
        }

        match method {
            PaymentMethod::Cash => {
                let order = self.inner.orders.create_cash_order(&cart.id, shipping).await?;
                add_breadcrumb("checkout", "Placed cash order", Some(&[("order_id", order.id.as_str())]));
                info!(order = %order.id, total = %order.total, "Order placed");

                if let Err(e) = self.inner.cart.refresh().await {
                    warn!(error = %e, "Could not reload cart after order");
                }
                Ok(CheckoutOutcome::Placed(order))
            }
            PaymentMethod::Card => {
                let session = self
                    .inner
                    .orders
                    .create_checkout_session(&cart.id, &self.inner.return_url)
                    .await?;
                let url = session
                    .url
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| AppError::Checkout("Failed to create checkout session".to_string()))?;
                info!(session = ?session.id, "Checkout session created");
                Ok(CheckoutOutcome::Redirect(url))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use bazaar_core::{AddressId, OrderId, OrderStatus, Price};

    use super::*;
    use crate::cache::cart::tests::{ScriptedCart, cart_with, signed_in_gate};

    #[derive(Default)]
    struct RecordingOrders {
        session_url: Option<String>,
        cash_orders: Mutex<Vec<(CartId, ShippingAddress)>>,
        sessions: Mutex<Vec<(CartId, String)>>,
    }

    impl OrderBackend for RecordingOrders {
        async fn create_cash_order(
            &self,
            cart: &CartId,
            shipping: &ShippingAddress,
        ) -> std::result::Result<Order, ApiError> {
            self.cash_orders
                .lock()
                .unwrap()
                .push((cart.clone(), shipping.clone()));
            Ok(Order {
                id: OrderId::new("order-1"),
                number: Some(42),
                user: None,
                lines: vec![],
                shipping_address: Some(shipping.clone()),
                tax: Price::ZERO,
                shipping: Price::ZERO,
                total: Price::from_units(80),
                payment_method: PaymentMethod::Cash,
                status: OrderStatus::Pending,
                paid_at: None,
                delivered_at: None,
                created_at: None,
            })
        }

        async fn create_checkout_session(
            &self,
            cart: &CartId,
            return_url: &str,
        ) -> std::result::Result<CheckoutSession, ApiError> {
            self.sessions
                .lock()
                .unwrap()
                .push((cart.clone(), return_url.to_string()));
            Ok(CheckoutSession {
                id: Some("cs_test_1".to_string()),
                url: self.session_url.clone(),
            })
        }
    }

    fn shipping() -> ShippingAddress {
        ShippingAddress {
            details: "12 Nile Street".to_string(),
            phone: "01012345678".to_string(),
            city: "Cairo".to_string(),
        }
    }

    async fn checkout_with(
        orders: RecordingOrders,
        cart: ScriptedCart,
    ) -> Checkout<RecordingOrders, ScriptedCart> {
        let cart = CartCache::new(cart, signed_in_gate());
        cart.fetch().await.unwrap();
        Checkout::new(orders, cart, "http://localhost:3000")
    }

    #[tokio::test]
    async fn test_cash_order_refreshes_cart() {
        let backend = ScriptedCart::default()
            .then(Ok(cart_with(&[("a", 20, 1), ("b", 30, 2)])))
            .then(Err(ApiError::NotFound("No cart exist for this user".to_string())));
        let checkout = checkout_with(RecordingOrders::default(), backend).await;

        assert_eq!(checkout.summary().await.unwrap().total, Price::from_units(103));
        let outcome = checkout.place_order(PaymentMethod::Cash, &shipping()).await.unwrap();

        let CheckoutOutcome::Placed(order) = outcome else {
            panic!("expected a placed order");
        };
        assert_eq!(order.id, OrderId::new("order-1"));
        let placed = checkout.inner.orders.cash_orders.lock().unwrap().clone();
        assert_eq!(placed, vec![(CartId::new("cart-1"), shipping())]);
        assert_eq!(checkout.inner.cart.cart().await, None);
    }

    #[tokio::test]
    async fn test_card_returns_redirect() {
        let orders = RecordingOrders {
            session_url: Some("https://checkout.example.com/pay/cs_test_1".to_string()),
            ..RecordingOrders::default()
        };
        let backend = ScriptedCart::default().then(Ok(cart_with(&[("a", 20, 1)])));
        let checkout = checkout_with(orders, backend).await;

        let outcome = checkout.place_order(PaymentMethod::Card, &shipping()).await.unwrap();
        assert_eq!(
            outcome,
            CheckoutOutcome::Redirect("https://checkout.example.com/pay/cs_test_1".to_string())
        );
        let sessions = checkout.inner.orders.sessions.lock().unwrap().clone();
        assert_eq!(
            sessions,
            vec![(CartId::new("cart-1"), "http://localhost:3000".to_string())]
        );
        // The cart is untouched until payment completes.
        assert!(checkout.inner.cart.cart().await.is_some());
    }

    #[tokio::test]
    async fn test_card_session_without_url_fails() {
        let backend = ScriptedCart::default().then(Ok(cart_with(&[("a", 20, 1)])));
        let checkout = checkout_with(RecordingOrders::default(), backend).await;

        let err = checkout.place_order(PaymentMethod::Card, &shipping()).await.unwrap_err();
        assert!(matches!(err, AppError::Checkout(_)));
    }

    #[tokio::test]
    async fn test_empty_cart_and_blank_fields_send_nothing() {
        let backend = ScriptedCart::default().then(Ok(cart_with(&[])));
        let checkout = checkout_with(RecordingOrders::default(), backend).await;
        let err = checkout.place_order(PaymentMethod::Cash, &shipping()).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyCart));

        let backend = ScriptedCart::default().then(Ok(cart_with(&[("a", 20, 1)])));
        let checkout = checkout_with(RecordingOrders::default(), backend).await;
        let blank = ShippingAddress {
            city: "  ".to_string(),
            ..shipping()
        };
        let err = checkout.place_order(PaymentMethod::Cash, &blank).await.unwrap_err();
        assert_eq!(err.user_message("x"), "Please fill in all fields");
        assert!(checkout.inner.orders.cash_orders.lock().unwrap().is_empty());
    }

    #[test]
    fn test_default_shipping_is_first_saved() {
        let addresses = vec![
            Address {
                id: AddressId::new("a1"),
                name: "Home".to_string(),
                details: "12 Nile Street".to_string(),
                phone: "01012345678".to_string(),
                city: "Cairo".to_string(),
            },
            Address {
                id: AddressId::new("a2"),
                name: "Work".to_string(),
                details: "5 Tahrir Square".to_string(),
                phone: "01112345678".to_string(),
                city: "Giza".to_string(),
            },
        ];
        assert_eq!(default_shipping(&addresses), Some(shipping()));
        assert_eq!(default_shipping(&[]), None);
    }
}
