//! Cache types for catalog responses.

use std::sync::Arc;

use bazaar_core::ProductId;

use crate::api::types::Product;

/// Cache key for the product listing and single products.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<[Product]>),
    Product(Box<Product>),
}
