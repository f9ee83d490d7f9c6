//! Wishlist endpoints.

use bazaar_core::ProductId;
use tracing::instrument;

use super::conversions::{convert_product, convert_wishlist_ids};
use super::types::Product;
use super::wire::{MaybeEnveloped, ProductRef, RawProduct, RawWishlistIds};
use super::{ApiClient, ApiError, segment};

impl ApiClient {
    /// Get the signed-in user's wishlist as full products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> Result<Vec<Product>, ApiError> {
        let raw: MaybeEnveloped<RawProduct> = self.execute(self.get("/wishlist")?).await?;
        Ok(raw.into_items().into_iter().filter_map(convert_product).collect())
    }

    /// Add a product. Returns the ids now on the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn add_to_wishlist(&self, product: &ProductId) -> Result<Vec<ProductId>, ApiError> {
        let body = ProductRef {
            product_id: product.as_str(),
        };
        let raw: RawWishlistIds = self.execute(self.post("/wishlist")?.json(&body)).await?;
        Ok(convert_wishlist_ids(raw))
    }

    /// Remove a product. Returns the ids still on the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn remove_from_wishlist(
        &self,
        product: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError> {
        let path = format!("/wishlist/{}", segment(product.as_str()));
        let raw: RawWishlistIds = self.execute(self.delete(&path)?).await?;
        Ok(convert_wishlist_ids(raw))
    }
}
