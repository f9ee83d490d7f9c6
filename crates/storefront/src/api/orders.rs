//! Order endpoints.

use bazaar_core::{CartId, UserId};
use tracing::instrument;

use super::conversions::{convert_checkout_session, convert_order, convert_orders};
use super::types::{CheckoutSession, Order, ShippingAddress};
use super::wire::{CashOrderBody, DataEnvelope, MaybeEnveloped, RawOrder, RawShippingAddress};
use super::{ApiClient, ApiError, segment};

impl ApiClient {
    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(user = %user))]
    pub async fn user_orders(&self, user: &UserId) -> Result<Vec<Order>, ApiError> {
        let path = format!("/orders/user/{}", segment(user.as_str()));
        let raw: MaybeEnveloped<RawOrder> = self.execute(self.get(&path)?).await?;
        Ok(convert_orders(raw.into_items()))
    }

    /// Place a cash-on-delivery order for a cart. The upstream consumes the
    /// cart on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, shipping), fields(cart = %cart))]
    pub async fn create_cash_order(
        &self,
        cart: &CartId,
        shipping: &ShippingAddress,
    ) -> Result<Order, ApiError> {
        let path = format!("/orders/{}", segment(cart.as_str()));
        let address = RawShippingAddress {
            details: shipping.details.clone(),
            phone: shipping.phone.clone(),
            city: shipping.city.clone(),
        };
        let body = CashOrderBody {
            shipping_address: &address,
        };
        let raw: DataEnvelope<RawOrder> = self.execute(self.post(&path)?.json(&body)).await?;
        convert_order(raw.data).ok_or(ApiError::MissingData("order id"))
    }

    /// Open a hosted card checkout session for a cart.
    ///
    /// `return_url` is the origin the hosted page sends the shopper back to.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(cart = %cart))]
    pub async fn create_checkout_session(
        &self,
        cart: &CartId,
        return_url: &str,
    ) -> Result<CheckoutSession, ApiError> {
        let mut url = self.endpoint(&format!(
            "/orders/checkout-session/{}",
            segment(cart.as_str())
        ))?;
        url.query_pairs_mut().append_pair("url", return_url);

        let raw = self
            .execute(self.request(reqwest::Method::POST, url))
            .await?;
        Ok(convert_checkout_session(raw))
    }
}
