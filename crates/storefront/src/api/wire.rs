//! Raw upstream response and request bodies.
//!
//! These mirror the upstream JSON exactly, including its inconsistencies:
//! entities may carry `_id`, `id` or both, numeric fields may be `null`, and
//! some endpoints wrap payloads in `{status, data}` while others do not.
//! Nothing outside [`super`] should see these types.

use bazaar_core::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Shared
// =============================================================================

/// Either a single value or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// `{ "data": T }` envelope, with the status fields the upstream sometimes adds.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

/// A list payload that may or may not be enveloped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MaybeEnveloped<T> {
    Enveloped(DataEnvelope<Vec<T>>),
    Bare(Vec<T>),
}

impl<T> MaybeEnveloped<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Enveloped(envelope) => envelope.data,
            Self::Bare(items) => items,
        }
    }
}

/// Named reference (category, brand, subcategory).
#[derive(Debug, Deserialize)]
pub struct RawNamed {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub price_after_discount: Option<Price>,
    #[serde(default)]
    pub sold: Option<i64>,
    #[serde(default)]
    pub image_cover: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<RawNamed>,
    #[serde(default)]
    pub brand: Option<RawNamed>,
    #[serde(default)]
    pub subcategory: Vec<RawNamed>,
    #[serde(default)]
    pub ratings_average: Option<f64>,
    #[serde(default)]
    pub ratings_quantity: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawPageMetadata {
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub number_of_pages: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RawProductList {
    #[serde(default)]
    pub results: Option<u32>,
    #[serde(default)]
    pub metadata: RawPageMetadata,
    #[serde(default)]
    pub data: Vec<RawProduct>,
}

/// A line's product, either populated or left as the bare product id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawProductRef {
    Id(String),
    Populated(RawProduct),
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RawCartItem {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub price: Option<Price>,
    pub product: RawProductRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCart {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub cart_owner: Option<String>,
    #[serde(default)]
    pub products: Vec<RawCartItem>,
    #[serde(default)]
    pub total_cart_price: Option<Price>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCartResponse {
    #[serde(default)]
    pub num_of_cart_items: Option<u32>,
    #[serde(default)]
    pub cart_id: Option<String>,
    pub data: RawCart,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef<'a> {
    pub product_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CountBody {
    pub count: u32,
}

// =============================================================================
// Wishlist
// =============================================================================

/// Wishlist mutations answer with the bare list of product ids.
#[derive(Debug, Deserialize)]
pub struct RawWishlistIds {
    #[serde(default)]
    pub data: Vec<String>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RawOrderLine {
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub price: Option<Price>,
    pub product: RawProductRef,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RawShippingAddress {
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
}

/// Order `id` is a sequential number while `_id` is the document id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub cart_items: Vec<RawOrderLine>,
    #[serde(default)]
    pub shipping_address: Option<RawShippingAddress>,
    #[serde(default)]
    pub tax_price: Option<Price>,
    #[serde(default)]
    pub shipping_price: Option<Price>,
    #[serde(default)]
    pub total_order_price: Option<Price>,
    #[serde(default)]
    pub payment_method_type: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashOrderBody<'a> {
    pub shipping_address: &'a RawShippingAddress,
}

#[derive(Debug, Deserialize)]
pub struct RawCheckoutSession {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCheckoutResponse {
    #[serde(default)]
    pub session: Option<RawCheckoutSession>,
}

// =============================================================================
// Auth and Profile
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// `/auth/signin`, `/auth/resetPassword` and `/users/changeMyPassword` all
/// answer with an optional token and user.
#[derive(Debug, Deserialize)]
pub struct RawAuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<RawUser>,
}

/// `/users/me` answers with either `{data: {user}}` or `{data: user}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawMe {
    Nested { user: RawUser },
    Flat(RawUser),
}

#[derive(Debug, Deserialize)]
pub struct RawAddress {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpBody<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub re_password: &'a str,
    pub phone: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignInBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EmailBody<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetCodeBody<'a> {
    pub reset_code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody<'a> {
    pub email: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody<'a> {
    pub current_password: &'a str,
    pub password: &'a str,
    pub re_password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AddressBody<'a> {
    pub name: &'a str,
    pub details: &'a str,
    pub phone: &'a str,
    pub city: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
}
