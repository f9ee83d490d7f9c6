//! Product endpoints.

use bazaar_core::ProductId;
use tracing::instrument;

use super::conversions::{convert_product, convert_product_page};
use super::types::{Product, ProductPage};
use super::wire::{DataEnvelope, RawProduct, RawProductList};
use super::{ApiClient, ApiError, segment};

impl ApiClient {
    /// List the product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<ProductPage, ApiError> {
        let raw: RawProductList = self.execute(self.get("/products")?).await?;
        Ok(convert_product_page(raw))
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let path = format!("/products/{}", segment(id.as_str()));
        let raw: DataEnvelope<RawProduct> = self.execute(self.get(&path)?).await?;
        convert_product(raw.data).ok_or_else(|| ApiError::NotFound(format!("Product {id}")))
    }
}
