//! Wishlist commands.

use bazaar_core::ProductId;
use bazaar_storefront::{AppError, Storefront};
use tracing::info;

use super::protected;
use crate::WishlistAction;

pub async fn run(storefront: &Storefront, action: WishlistAction) -> Result<(), AppError> {
    protected(storefront)?;
    let wishlist = storefront.wishlist();
    wishlist.fetch().await?;

    match action {
        WishlistAction::Show => {
            let items = wishlist.items().await;
            if items.is_empty() {
                info!("Your wishlist is empty");
            }
            for product in items {
                info!("{}  {}  {}", product.id, product.title, product.effective_price());
            }
        }
        WishlistAction::Add { product } => {
            let id = ProductId::new(product);
            if wishlist.contains(&id).await {
                info!("Already in your wishlist");
            } else {
                wishlist.add(&id).await?;
                info!("Added to wishlist ({} items)", wishlist.count().await);
            }
        }
        WishlistAction::Remove { product } => {
            wishlist.remove(&ProductId::new(product)).await?;
            info!("Removed from wishlist");
        }
    }
    Ok(())
}
