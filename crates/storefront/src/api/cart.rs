//! Cart endpoints.
//!
//! Every mutation answers with the complete updated cart.

use bazaar_core::{CartItemId, ProductId};
use tracing::instrument;

use super::conversions::convert_cart;
use super::types::Cart;
use super::wire::{CountBody, ProductRef, RawCartResponse};
use super::{ApiClient, ApiError, segment};

impl ApiClient {
    /// Get the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. A user without a cart gets an
    /// error for which [`ApiError::is_no_cart`] is true.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Cart, ApiError> {
        let raw: RawCartResponse = self.execute(self.get("/cart")?).await?;
        convert_cart(raw)
    }

    /// Add one unit of a product, creating the cart if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn add_to_cart(&self, product: &ProductId) -> Result<Cart, ApiError> {
        let body = ProductRef {
            product_id: product.as_str(),
        };
        let raw: RawCartResponse = self.execute(self.post("/cart")?.json(&body)).await?;
        convert_cart(raw)
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(item = %item))]
    pub async fn update_cart_item(&self, item: &CartItemId, count: u32) -> Result<Cart, ApiError> {
        let path = format!("/cart/{}", segment(item.as_str()));
        let raw: RawCartResponse = self
            .execute(self.put(&path)?.json(&CountBody { count }))
            .await?;
        convert_cart(raw)
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(item = %item))]
    pub async fn remove_cart_item(&self, item: &CartItemId) -> Result<Cart, ApiError> {
        let path = format!("/cart/{}", segment(item.as_str()));
        let raw: RawCartResponse = self.execute(self.delete(&path)?).await?;
        convert_cart(raw)
    }

    /// Delete the whole cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.execute_unit(self.delete("/cart")?).await
    }
}
