//! Conversions from raw upstream bodies to canonical types.
//!
//! Every upstream response passes through here exactly once. Entities that
//! arrive without any usable identifier are dropped with a warning rather than
//! failing the whole response.

pub mod cart;
pub mod error;
pub mod order;
pub mod product;
pub mod profile;
pub mod wishlist;

pub use cart::convert_cart;
pub use error::extract_message;
pub use order::{convert_checkout_session, convert_order, convert_orders};
pub use product::{convert_product, convert_product_page};
pub use profile::{convert_address, convert_addresses, convert_auth, convert_user};
pub use wishlist::convert_wishlist_ids;

/// Pick the canonical identifier from the `_id`/`id` pair.
///
/// The canonical id is `_id` when present, otherwise `id`. The other variant
/// is returned as the alternate only when it differs.
pub(crate) fn canonical_ids(
    mongo_id: Option<String>,
    id: Option<String>,
) -> Option<(String, Option<String>)> {
    let mongo_id = mongo_id.filter(|s| !s.is_empty());
    let id = id.filter(|s| !s.is_empty());
    match (mongo_id, id) {
        (Some(primary), Some(alt)) if alt != primary => Some((primary, Some(alt))),
        (Some(primary), _) | (None, Some(primary)) => Some((primary, None)),
        (None, None) => None,
    }
}

/// Clamp an upstream integer count into `u32`, treating negatives as zero.
pub(crate) fn count_from(raw: Option<i64>) -> u32 {
    raw.map_or(0, |n| {
        u32::try_from(n.clamp(0, i64::from(u32::MAX))).unwrap_or(u32::MAX)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_prefers_mongo_id() {
        assert_eq!(
            canonical_ids(Some("a".into()), Some("b".into())),
            Some(("a".to_string(), Some("b".to_string())))
        );
        assert_eq!(
            canonical_ids(Some("a".into()), Some("a".into())),
            Some(("a".to_string(), None))
        );
        assert_eq!(canonical_ids(None, Some("b".into())), Some(("b".to_string(), None)));
        assert_eq!(canonical_ids(Some(String::new()), None), None);
    }

    #[test]
    fn test_count_from_clamps() {
        assert_eq!(count_from(Some(3)), 3);
        assert_eq!(count_from(Some(-2)), 0);
        assert_eq!(count_from(None), 0);
        assert_eq!(count_from(Some(i64::MAX)), u32::MAX);
    }
}
