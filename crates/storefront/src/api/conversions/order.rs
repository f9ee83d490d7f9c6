//! Order conversion functions.

use bazaar_core::{OrderId, OrderStatus, PaymentMethod, Price, ProductId, UserId};
use serde_json::Value;
use tracing::warn;

use super::{canonical_ids, count_from};
use crate::api::types::{CheckoutSession, Order, OrderLine, ShippingAddress};
use crate::api::wire::{RawCheckoutResponse, RawOrder, RawOrderLine, RawProductRef};

fn convert_order_line(raw: RawOrderLine) -> Option<OrderLine> {
    let (product_id, title, image_cover) = match raw.product {
        RawProductRef::Id(id) if !id.is_empty() => (id, None, None),
        RawProductRef::Id(_) => return None,
        RawProductRef::Populated(product) => {
            let (id, _) = canonical_ids(product.mongo_id, product.id)?;
            (
                id,
                Some(product.title).filter(|t| !t.is_empty()),
                product.image_cover,
            )
        }
    };

    Some(OrderLine {
        product_id: ProductId::new(product_id),
        title,
        image_cover,
        price: raw.price.unwrap_or(Price::ZERO),
        count: count_from(raw.count),
    })
}

/// The `user` field is either an id string or a populated user document.
fn user_from(value: Option<Value>) -> Option<UserId> {
    match value? {
        Value::String(id) if !id.is_empty() => Some(UserId::new(id)),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str)
            .map(UserId::new),
        _ => None,
    }
}

/// Convert one order. Returns `None` when the order has no document id.
pub fn convert_order(raw: RawOrder) -> Option<Order> {
    let number = raw.id.as_ref().and_then(Value::as_u64);
    let fallback_id = raw.id.as_ref().and_then(Value::as_str).map(str::to_string);
    let Some((id, _)) = canonical_ids(raw.mongo_id, fallback_id) else {
        warn!(?number, "Dropping order without an id");
        return None;
    };

    let payment_method = raw
        .payment_method_type
        .as_deref()
        .and_then(|method| method.parse::<PaymentMethod>().ok())
        .unwrap_or_default();

    Some(Order {
        id: OrderId::new(id),
        number,
        user: user_from(raw.user),
        lines: raw.cart_items.into_iter().filter_map(convert_order_line).collect(),
        shipping_address: raw.shipping_address.map(|a| ShippingAddress {
            details: a.details,
            phone: a.phone,
            city: a.city,
        }),
        tax: raw.tax_price.unwrap_or(Price::ZERO),
        shipping: raw.shipping_price.unwrap_or(Price::ZERO),
        total: raw.total_order_price.unwrap_or(Price::ZERO),
        payment_method,
        status: OrderStatus::from_flags(raw.is_paid, raw.is_delivered),
        paid_at: raw.paid_at,
        delivered_at: raw.delivered_at,
        created_at: raw.created_at,
    })
}

/// Convert an order list, newest first.
pub fn convert_orders(raw: Vec<RawOrder>) -> Vec<Order> {
    let mut orders: Vec<Order> = raw.into_iter().filter_map(convert_order).collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

pub fn convert_checkout_session(raw: RawCheckoutResponse) -> CheckoutSession {
    raw.session.map_or(
        CheckoutSession {
            id: None,
            url: None,
        },
        |session| CheckoutSession {
            id: session.id,
            url: session.url.filter(|url| !url.is_empty()),
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::wire::MaybeEnveloped;

    fn order_json(mongo_id: &str, created_at: &str) -> Value {
        serde_json::json!({
            "shippingAddress": {"details": "12 Nile St", "phone": "01012345678", "city": "Cairo"},
            "taxPrice": 8,
            "shippingPrice": 15,
            "totalOrderPrice": 103,
            "paymentMethodType": "cash",
            "isPaid": false,
            "isDelivered": false,
            "_id": mongo_id,
            "user": {"_id": "user-1", "name": "Mona"},
            "cartItems": [
                {"count": 1, "_id": "x", "product": "p-a", "price": 20},
                {"count": 2, "_id": "y", "product": {"_id": "p-b", "title": "Scarf"}, "price": 30}
            ],
            "createdAt": created_at,
            "id": 42
        })
    }

    #[test]
    fn test_convert_order_with_mixed_product_shapes() {
        let raw: RawOrder =
            serde_json::from_value(order_json("o-1", "2024-01-01T00:00:00Z")).unwrap();
        let order = convert_order(raw).unwrap();

        assert_eq!(order.id.as_str(), "o-1");
        assert_eq!(order.number, Some(42));
        assert_eq!(order.user, Some(UserId::new("user-1")));
        assert_eq!(order.payment_method, PaymentMethod::Cash);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Price::from_units(103));

        let first = order.lines.first().unwrap();
        assert_eq!(first.product_id.as_str(), "p-a");
        assert_eq!(first.title, None);
        let second = order.lines.get(1).unwrap();
        assert_eq!(second.title.as_deref(), Some("Scarf"));
    }

    #[test]
    fn test_order_list_accepts_bare_array_and_envelope() {
        let older = order_json("o-old", "2024-01-01T00:00:00Z");
        let newer = order_json("o-new", "2024-03-01T00:00:00Z");

        let bare: MaybeEnveloped<RawOrder> =
            serde_json::from_value(serde_json::json!([older.clone(), newer.clone()])).unwrap();
        let enveloped: MaybeEnveloped<RawOrder> = serde_json::from_value(
            serde_json::json!({"status": "success", "results": 2, "data": [older, newer]}),
        )
        .unwrap();

        for list in [bare, enveloped] {
            let orders = convert_orders(list.into_items());
            let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
            assert_eq!(ids, vec!["o-new", "o-old"]);
        }
    }

    #[test]
    fn test_checkout_session_without_url() {
        let raw: RawCheckoutResponse =
            serde_json::from_value(serde_json::json!({"status": "success", "session": {"id": "cs_1", "url": ""}}))
                .unwrap();
        let session = convert_checkout_session(raw);
        assert_eq!(session.id.as_deref(), Some("cs_1"));
        assert_eq!(session.url, None);
    }
}
