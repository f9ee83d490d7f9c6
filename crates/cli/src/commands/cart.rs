//! Cart commands.

use bazaar_core::{CartItemId, ProductId};
use bazaar_storefront::api::types::Cart;
use bazaar_storefront::checkout::OrderSummary;
use bazaar_storefront::{AppError, Storefront};
use tracing::info;

use super::protected;
use crate::CartAction;

pub async fn run(storefront: &Storefront, action: CartAction) -> Result<(), AppError> {
    protected(storefront)?;
    let cart = storefront.cart();

    match action {
        CartAction::Show => {
            cart.fetch().await?;
            match cart.cart().await {
                Some(current) if !current.is_empty() => log_cart(&current),
                _ => info!("Your cart is empty"),
            }
        }
        CartAction::Add { product } => {
            let updated = cart.add_item(&ProductId::new(product)).await?;
            info!("Product added to cart ({} items)", updated.item_count());
        }
        CartAction::Update { item, count } => {
            let updated = cart.update_item(&CartItemId::new(item), count).await?;
            log_cart(&updated);
        }
        CartAction::Remove { item } => {
            let updated = cart.remove_item(&CartItemId::new(item)).await?;
            info!("Item removed ({} items left)", updated.item_count());
        }
        CartAction::Clear => {
            cart.clear_all().await?;
            info!("Cart cleared");
        }
    }
    Ok(())
}

fn log_cart(cart: &Cart) {
    for item in &cart.items {
        info!(
            "{}  {} x {} @ {} = {}",
            item.id,
            item.count,
            item.product.title,
            item.price,
            item.line_total()
        );
    }

    let summary = OrderSummary::for_cart(cart);
    info!("Subtotal: {}", summary.subtotal);
    info!("Tax (10%): {}", summary.tax);
    if summary.is_free_shipping() {
        info!("Shipping: FREE");
    } else {
        info!("Shipping: {}", summary.shipping);
    }
    info!("Total: {}", summary.total);
    if let Some(remaining) = summary.free_shipping_remaining() {
        info!("Add {remaining} more for free shipping");
    }
}
