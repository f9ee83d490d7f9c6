//! Order history and checkout commands.

use bazaar_core::{AddressId, PaymentMethod};
use bazaar_storefront::api::types::ShippingAddress;
use bazaar_storefront::checkout::{CheckoutOutcome, default_shipping};
use bazaar_storefront::{AppError, Storefront};
use tracing::info;

use super::protected;
use crate::CheckoutArgs;

pub async fn list(storefront: &Storefront) -> Result<(), AppError> {
    protected(storefront)?;
    let orders = storefront.orders().await?;
    if orders.is_empty() {
        info!("No orders yet");
    }

    for order in orders {
        let number = order
            .number
            .map_or_else(|| order.id.to_string(), |n| format!("#{n}"));
        let placed = order
            .created_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string());
        info!(
            "{number}  {placed}  {} item(s)  {}  {}  {}",
            order.lines.len(),
            order.total,
            order.payment_method,
            order.status
        );
    }
    Ok(())
}

pub async fn checkout(storefront: &Storefront, args: CheckoutArgs) -> Result<(), AppError> {
    protected(storefront)?;
    storefront.cart().fetch().await?;

    let shipping = shipping_for(storefront, &args).await?;
    let method = if args.cash {
        PaymentMethod::Cash
    } else {
        PaymentMethod::Card
    };

    if let Some(summary) = storefront.checkout().summary().await {
        info!(
            "Subtotal {} + tax {} + shipping {} = {}",
            summary.subtotal, summary.tax, summary.shipping, summary.total
        );
    }

    match storefront.checkout().place_order(method, &shipping).await? {
        CheckoutOutcome::Placed(order) => {
            let number = order.number.map_or_else(String::new, |n| format!(" #{n}"));
            info!("Order{number} placed successfully, total {}", order.total);
        }
        CheckoutOutcome::Redirect(url) => {
            info!("Complete your payment at {url}");
        }
    }
    Ok(())
}

/// Shipping details from the flags, a saved address, or the default saved
/// address.
async fn shipping_for(
    storefront: &Storefront,
    args: &CheckoutArgs,
) -> Result<ShippingAddress, AppError> {
    if let Some(details) = &args.details {
        return Ok(ShippingAddress {
            details: details.clone(),
            phone: args.phone.clone().unwrap_or_default(),
            city: args.city.clone().unwrap_or_default(),
        });
    }

    let book = storefront.addresses();
    book.fetch().await?;
    match &args.address {
        Some(id) => book
            .get(&AddressId::new(id.as_str()))
            .await
            .map(|address| ShippingAddress::from(&address))
            .ok_or_else(|| AppError::NotFound(format!("Address {id}"))),
        None => default_shipping(&book.addresses().await).ok_or_else(|| {
            AppError::Checkout(
                "No saved address; pass --details, --phone and --city".to_string(),
            )
        }),
    }
}
