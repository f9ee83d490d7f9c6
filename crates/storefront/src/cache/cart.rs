//! Cart cache provider.

use std::future::Future;
use std::sync::Arc;

use bazaar_core::{CartItemId, Price, ProductId};
use tracing::{debug, instrument};

use super::{CacheCell, Snapshot};
use crate::api::types::Cart;
use crate::api::{ApiClient, ApiError};
use crate::auth::AuthGate;
use crate::error::{Result, add_breadcrumb};

const LOAD_FAILED: &str = "Failed to load cart";
const ADD_FAILED: &str = "Failed to add item to cart";
const UPDATE_FAILED: &str = "Failed to update item";
const REMOVE_FAILED: &str = "Failed to remove item";
const CLEAR_FAILED: &str = "Failed to clear cart";

/// Cart operations the cache needs from the upstream.
pub trait CartBackend: Send + Sync + 'static {
    fn get_cart(&self) -> impl Future<Output = std::result::Result<Cart, ApiError>> + Send;

    fn add_to_cart(
        &self,
        product: &ProductId,
    ) -> impl Future<Output = std::result::Result<Cart, ApiError>> + Send;

    fn update_cart_item(
        &self,
        item: &CartItemId,
        count: u32,
    ) -> impl Future<Output = std::result::Result<Cart, ApiError>> + Send;

    fn remove_cart_item(
        &self,
        item: &CartItemId,
    ) -> impl Future<Output = std::result::Result<Cart, ApiError>> + Send;

    fn clear_cart(&self) -> impl Future<Output = std::result::Result<(), ApiError>> + Send;
}

impl CartBackend for ApiClient {
    fn get_cart(&self) -> impl Future<Output = std::result::Result<Cart, ApiError>> + Send {
        Self::get_cart(self)
    }

    fn add_to_cart(
        &self,
        product: &ProductId,
    ) -> impl Future<Output = std::result::Result<Cart, ApiError>> + Send {
        Self::add_to_cart(self, product)
    }

    fn update_cart_item(
        &self,
        item: &CartItemId,
        count: u32,
    ) -> impl Future<Output = std::result::Result<Cart, ApiError>> + Send {
        Self::update_cart_item(self, item, count)
    }

    fn remove_cart_item(
        &self,
        item: &CartItemId,
    ) -> impl Future<Output = std::result::Result<Cart, ApiError>> + Send {
        Self::remove_cart_item(self, item)
    }

    fn clear_cart(&self) -> impl Future<Output = std::result::Result<(), ApiError>> + Send {
        Self::clear_cart(self)
    }
}

/// The signed-in user's cart as last reported by the server.
///
/// `None` means no cart: signed out, never created, or cleared.
pub struct CartCache<B> {
    inner: Arc<CartCacheInner<B>>,
}

struct CartCacheInner<B> {
    backend: B,
    gate: AuthGate,
    cell: CacheCell<Option<Cart>>,
}

impl<B> Clone for CartCache<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CartBackend> CartCache<B> {
    #[must_use]
    pub fn new(backend: B, gate: AuthGate) -> Self {
        Self {
            inner: Arc::new(CartCacheInner {
                backend,
                gate,
                cell: CacheCell::default(),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn snapshot(&self) -> Snapshot<Option<Cart>> {
        self.inner.cell.snapshot().await
    }

    pub async fn cart(&self) -> Option<Cart> {
        self.inner.cell.read(Clone::clone).await
    }

    /// Total quantity across all lines, computed on every read.
    pub async fn item_count(&self) -> u32 {
        self.inner
            .cell
            .read(|cart| cart.as_ref().map_or(0, Cart::item_count))
            .await
    }

    /// The server-computed cart total.
    pub async fn subtotal(&self) -> Price {
        self.inner
            .cell
            .read(|cart| cart.as_ref().map_or(Price::ZERO, |c| c.total))
            .await
    }

    /// Quantity of a product in the cart.
    pub async fn quantity_of(&self, product: &ProductId) -> u32 {
        self.inner
            .cell
            .read(|cart| {
                cart.as_ref()
                    .and_then(|c| c.line_for(product))
                    .map_or(0, |line| line.count)
            })
            .await
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the cart. Signed-out users get no cart and no request is made.
    ///
    /// A user who has never had a cart is not an error.
    ///
    /// # Errors
    ///
    /// Returns the upstream error for any other failure; the cached cart is
    /// cleared and the error flag set.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<()> {
        let _op = self.inner.cell.lock().await;
        self.fetch_locked().await
    }

    async fn fetch_locked(&self) -> Result<()> {
        let cell = &self.inner.cell;
        if !self.inner.gate.is_authenticated() {
            cell.begin().await;
            cell.finish(|cart| *cart = None).await;
            return Ok(());
        }

        cell.begin().await;
        match self.inner.backend.get_cart().await {
            Ok(fresh) => {
                cell.finish(|cart| *cart = Some(fresh)).await;
                Ok(())
            }
            Err(err) if err.is_no_cart() => {
                debug!("User has no cart yet");
                cell.finish(|cart| *cart = None).await;
                Ok(())
            }
            Err(err) => {
                cell.fail(LOAD_FAILED, &err, |cart| *cart = None).await;
                Err(err.into())
            }
        }
    }

    /// Replace the cache with a mutation's response.
    ///
    /// Lines the response left unpopulated keep the product details already
    /// cached for them.
    async fn apply(
        &self,
        result: std::result::Result<Cart, ApiError>,
        failure: &'static str,
    ) -> Result<Cart> {
        let cell = &self.inner.cell;
        match result {
            Ok(mut fresh) => {
                if let Some(previous) = cell.read(Clone::clone).await {
                    fresh.fill_products_from(&previous);
                }
                let returned = fresh.clone();
                cell.finish(|cart| *cart = Some(fresh)).await;
                Ok(returned)
            }
            Err(err) => {
                cell.fail(failure, &err, |_| {}).await;
                Err(err.into())
            }
        }
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cached cart is left unchanged.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn add_item(&self, product: &ProductId) -> Result<Cart> {
        let _op = self.inner.cell.lock().await;
        self.inner.cell.begin().await;
        let result = self.inner.backend.add_to_cart(product).await;
        let cart = self.apply(result, ADD_FAILED).await?;
        add_breadcrumb("cart", "Added item", Some(&[("product_id", product.as_str())]));
        Ok(cart)
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cached cart is left unchanged.
    #[instrument(skip(self), fields(item = %item))]
    pub async fn update_item(&self, item: &CartItemId, count: u32) -> Result<Cart> {
        let _op = self.inner.cell.lock().await;
        self.inner.cell.begin().await;
        let result = self.inner.backend.update_cart_item(item, count).await;
        self.apply(result, UPDATE_FAILED).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cached cart is left unchanged.
    #[instrument(skip(self), fields(item = %item))]
    pub async fn remove_item(&self, item: &CartItemId) -> Result<Cart> {
        let _op = self.inner.cell.lock().await;
        self.inner.cell.begin().await;
        let result = self.inner.backend.remove_cart_item(item).await;
        self.apply(result, REMOVE_FAILED).await
    }

    /// Delete the whole cart.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cached cart is left unchanged.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<()> {
        let _op = self.inner.cell.lock().await;
        let cell = &self.inner.cell;
        cell.begin().await;
        match self.inner.backend.clear_cart().await {
            Ok(()) => {
                cell.finish(|cart| *cart = None).await;
                Ok(())
            }
            Err(err) => {
                cell.fail(CLEAR_FAILED, &err, |_| {}).await;
                Err(err.into())
            }
        }
    }

    /// Re-read the cart after the server changed it on its own, e.g. when an
    /// order consumed it.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch`].
    pub async fn refresh(&self) -> Result<()> {
        self.fetch().await
    }

    /// Forget the cached cart, as on sign-out.
    pub async fn reset(&self) {
        let _op = self.inner.cell.lock().await;
        self.inner.cell.reset().await;
    }
}
