//! Canonical domain types for the storefront API.
//!
//! These are the shapes the rest of the crate works with. Raw upstream
//! responses live in [`super::wire`] and are mapped here by
//! [`super::conversions`].

use bazaar_core::{
    AddressId, BrandId, CartId, CartItemId, CategoryId, OrderId, OrderStatus, PaymentMethod, Price,
    ProductId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Catalog Types
// =============================================================================

/// Product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
}

/// Product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Canonical identifier (`_id` when the upstream sends it).
    pub id: ProductId,
    /// The other identifier variant, when it differs from `id`.
    pub alt_id: Option<ProductId>,
    pub title: String,
    pub slug: String,
    pub description: String,
    /// Units in stock.
    pub stock: u32,
    pub price: Price,
    pub price_after_discount: Option<Price>,
    /// Units sold, when the upstream reports it.
    pub sold: Option<u32>,
    pub image_cover: Option<String>,
    pub images: Vec<String>,
    pub category: Option<Category>,
    pub brand: Option<Brand>,
    pub subcategories: Vec<String>,
    pub ratings_average: f64,
    pub ratings_quantity: u32,
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The price a shopper actually pays: the discounted price when present.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        self.price_after_discount.unwrap_or(self.price)
    }

    /// Whether the product is discounted below its list price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.price_after_discount
            .is_some_and(|discounted| discounted.amount < self.price.amount)
    }

    /// Whether `id` names this product under either identifier variant.
    #[must_use]
    pub fn matches_id(&self, id: &ProductId) -> bool {
        &self.id == id || self.alt_id.as_ref() == Some(id)
    }

    /// Category name, if the product is categorized.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }

    /// Brand name, if the product is branded.
    #[must_use]
    pub fn brand_name(&self) -> Option<&str> {
        self.brand.as_ref().map(|b| b.name.as_str())
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Pagination metadata reported alongside a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageInfo {
    pub current_page: u32,
    pub number_of_pages: u32,
    pub limit: u32,
    pub next_page: Option<u32>,
}

/// One page of products from the upstream listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Total result count reported by the upstream.
    pub results: u32,
    pub page_info: PageInfo,
}

// =============================================================================
// Cart Types
// =============================================================================

/// The product summary embedded in a cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub alt_id: Option<ProductId>,
    pub title: String,
    pub image_cover: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub ratings_average: f64,
    pub stock: u32,
}

impl CartProduct {
    /// Whether `id` names this product under either identifier variant.
    #[must_use]
    pub fn matches_id(&self, id: &ProductId) -> bool {
        &self.id == id || self.alt_id.as_ref() == Some(id)
    }

    /// Whether the upstream sent more than the bare product id.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        !self.title.is_empty()
    }
}

/// A cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line identifier, used for update and remove.
    pub id: CartItemId,
    pub product: CartProduct,
    /// Unit price.
    pub price: Price,
    pub count: u32,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.count)
    }
}

/// The signed-in user's cart, as last reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub owner: Option<UserId>,
    pub items: Vec<CartItem>,
    /// Server-computed total.
    pub total: Price,
    /// Number of distinct lines, as reported by the upstream.
    pub line_count: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Total quantity across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.count).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line holding a product.
    #[must_use]
    pub fn line_for(&self, product: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.matches_id(product))
    }

    /// Fill unpopulated line products with the details `previous` knew.
    pub fn fill_products_from(&mut self, previous: &Self) {
        for item in self.items.iter_mut().filter(|item| !item.product.is_populated()) {
            if let Some(known) = previous.line_for(&item.product.id) {
                item.product = known.product.clone();
            }
        }
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// Delivery details attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShippingAddress {
    pub details: String,
    pub phone: String,
    pub city: String,
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            details: address.details.clone(),
            phone: address.phone.clone(),
            city: address.city.clone(),
        }
    }
}

/// A line on a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Present only when the upstream populated the product.
    pub title: Option<String>,
    pub image_cover: Option<String>,
    pub price: Price,
    pub count: u32,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing sequential order number.
    pub number: Option<u64>,
    pub user: Option<UserId>,
    pub lines: Vec<OrderLine>,
    pub shipping_address: Option<ShippingAddress>,
    pub tax: Price,
    pub shipping: Price,
    pub total: Price,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A hosted card checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: Option<String>,
    pub url: Option<String>,
}

// =============================================================================
// Profile Types
// =============================================================================

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub name: String,
    pub details: String,
    pub phone: String,
    pub city: String,
}

/// The signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Result of a successful sign-in or password change.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub token: secrecy::SecretString,
    pub user: Option<UserProfile>,
}
