//! Cart conversion functions.

use bazaar_core::{CartId, CartItemId, Price, ProductId, UserId};
use tracing::warn;

use super::{canonical_ids, count_from};
use crate::api::ApiError;
use crate::api::types::{Cart, CartItem, CartProduct};
use crate::api::wire::{RawCartItem, RawCartResponse, RawProduct, RawProductRef};

fn convert_cart_product(raw: RawProduct) -> Option<CartProduct> {
    let (id, alt_id) = canonical_ids(raw.mongo_id, raw.id)?;
    Some(CartProduct {
        id: ProductId::new(id),
        alt_id: alt_id.map(ProductId::new),
        title: raw.title,
        image_cover: raw.image_cover.filter(|s| !s.is_empty()),
        category: raw.category.map(|c| c.name).filter(|n| !n.is_empty()),
        brand: raw.brand.map(|b| b.name).filter(|n| !n.is_empty()),
        ratings_average: raw.ratings_average.unwrap_or(0.0),
        stock: count_from(raw.quantity),
    })
}

/// A product the upstream left unpopulated: only the id is known.
fn bare_cart_product(id: String) -> Option<CartProduct> {
    if id.is_empty() {
        return None;
    }
    Some(CartProduct {
        id: ProductId::new(id),
        alt_id: None,
        title: String::new(),
        image_cover: None,
        category: None,
        brand: None,
        ratings_average: 0.0,
        stock: 0,
    })
}

fn convert_cart_item(raw: RawCartItem) -> Option<CartItem> {
    let Some((id, _)) = canonical_ids(raw.mongo_id, raw.id) else {
        warn!("Dropping cart line without an id");
        return None;
    };
    let product = match raw.product {
        RawProductRef::Id(product_id) => bare_cart_product(product_id),
        RawProductRef::Populated(product) => convert_cart_product(product),
    };
    let Some(product) = product else {
        warn!(line = %id, "Dropping cart line whose product has no id");
        return None;
    };

    Some(CartItem {
        id: CartItemId::new(id),
        product,
        price: raw.price.unwrap_or(Price::ZERO),
        count: count_from(raw.count),
    })
}

/// Convert a cart response.
///
/// # Errors
///
/// Returns `ApiError::MissingData` if the cart carries no identifier at all.
pub fn convert_cart(raw: RawCartResponse) -> Result<Cart, ApiError> {
    let data = raw.data;
    let (id, _) = canonical_ids(data.mongo_id, data.id.or(raw.cart_id))
        .ok_or(ApiError::MissingData("cart id"))?;

    let items: Vec<CartItem> = data.products.into_iter().filter_map(convert_cart_item).collect();
    let line_count = raw
        .num_of_cart_items
        .unwrap_or_else(|| u32::try_from(items.len()).unwrap_or(u32::MAX));
    let total = data
        .total_cart_price
        .unwrap_or_else(|| items.iter().map(CartItem::line_total).sum());

    Ok(Cart {
        id: CartId::new(id),
        owner: data.cart_owner.map(UserId::new),
        items,
        total,
        line_count,
        updated_at: data.updated_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_cart_response() {
        let raw: RawCartResponse = serde_json::from_value(serde_json::json!({
            "status": "success",
            "numOfCartItems": 2,
            "cartId": "cart-1",
            "data": {
                "_id": "cart-1",
                "cartOwner": "user-1",
                "products": [
                    {"count": 1, "_id": "line-a", "price": 20,
                     "product": {"_id": "p-a", "id": "p-a", "title": "Cap", "quantity": 5,
                                 "category": {"_id": "c", "name": "Hats"}}},
                    {"count": 2, "_id": "line-b", "price": 30,
                     "product": {"id": "p-b", "title": "Scarf"}}
                ],
                "totalCartPrice": 80,
                "__v": 3
            }
        }))
        .unwrap();

        let cart = convert_cart(raw).unwrap();
        assert_eq!(cart.id.as_str(), "cart-1");
        assert_eq!(cart.owner, Some(UserId::new("user-1")));
        assert_eq!(cart.line_count, 2);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total, Price::from_units(80));
        assert_eq!(cart.items.first().unwrap().product.category.as_deref(), Some("Hats"));
        assert_eq!(cart.items.get(1).unwrap().product.id.as_str(), "p-b");
    }

    #[test]
    fn test_convert_cart_computes_missing_total() {
        let raw: RawCartResponse = serde_json::from_value(serde_json::json!({
            "data": {"id": "c", "products": [
                {"count": 3, "_id": "l", "price": 5, "product": {"_id": "p"}}
            ]}
        }))
        .unwrap();

        let cart = convert_cart(raw).unwrap();
        assert_eq!(cart.total, Price::from_units(15));
        assert_eq!(cart.line_count, 1);
    }

    #[test]
    fn test_convert_cart_with_unpopulated_product() {
        let raw: RawCartResponse = serde_json::from_value(serde_json::json!({
            "data": {"_id": "cart-1", "products": [
                {"count": 1, "_id": "line-a", "product": "p-a", "price": 149},
                {"count": 1, "_id": "line-b", "product": "", "price": 5}
            ], "totalCartPrice": 149}
        }))
        .unwrap();

        let cart = convert_cart(raw).unwrap();
        assert_eq!(cart.items.len(), 1);
        let line = cart.items.first().unwrap();
        assert_eq!(line.id.as_str(), "line-a");
        assert_eq!(line.product.id.as_str(), "p-a");
        assert!(line.product.title.is_empty());
        assert_eq!(cart.total, Price::from_units(149));
    }

    #[test]
    fn test_convert_cart_without_id_fails() {
        let raw: RawCartResponse =
            serde_json::from_value(serde_json::json!({"data": {"products": []}})).unwrap();
        assert!(matches!(convert_cart(raw), Err(ApiError::MissingData("cart id"))));
    }
}
