//! Wishlist conversion functions.
//!
//! Reads return full products (see [`super::product`]); mutations return the
//! bare list of product ids now on the wishlist.

use bazaar_core::ProductId;

use crate::api::wire::RawWishlistIds;

pub fn convert_wishlist_ids(raw: RawWishlistIds) -> Vec<ProductId> {
    raw.data
        .into_iter()
        .filter(|id| !id.is_empty())
        .map(ProductId::new)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_wishlist_ids() {
        let raw: RawWishlistIds = serde_json::from_value(serde_json::json!({
            "status": "success",
            "message": "Product added successfully to your wishlist",
            "data": ["p1", "", "p2"]
        }))
        .unwrap();
        assert_eq!(
            convert_wishlist_ids(raw),
            vec![ProductId::new("p1"), ProductId::new("p2")]
        );
    }
}
