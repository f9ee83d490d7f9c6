//! Wishlist cache provider.

use std::future::Future;
use std::sync::Arc;

use bazaar_core::ProductId;
use tracing::instrument;

use super::{CacheCell, Snapshot};
use crate::api::types::Product;
use crate::api::{ApiClient, ApiError};
use crate::auth::AuthGate;
use crate::error::{Result, add_breadcrumb};

const LOAD_FAILED: &str = "Failed to load wishlist";
const ADD_FAILED: &str = "Failed to add to wishlist";
const REMOVE_FAILED: &str = "Failed to remove from wishlist";

/// Wishlist operations the cache needs from the upstream.
pub trait WishlistBackend: Send + Sync + 'static {
    fn get_wishlist(
        &self,
    ) -> impl Future<Output = std::result::Result<Vec<Product>, ApiError>> + Send;

    fn add_to_wishlist(
        &self,
        product: &ProductId,
    ) -> impl Future<Output = std::result::Result<Vec<ProductId>, ApiError>> + Send;

    fn remove_from_wishlist(
        &self,
        product: &ProductId,
    ) -> impl Future<Output = std::result::Result<Vec<ProductId>, ApiError>> + Send;
}

impl WishlistBackend for ApiClient {
    fn get_wishlist(
        &self,
    ) -> impl Future<Output = std::result::Result<Vec<Product>, ApiError>> + Send {
        Self::get_wishlist(self)
    }

    fn add_to_wishlist(
        &self,
        product: &ProductId,
    ) -> impl Future<Output = std::result::Result<Vec<ProductId>, ApiError>> + Send {
        Self::add_to_wishlist(self, product)
    }

    fn remove_from_wishlist(
        &self,
        product: &ProductId,
    ) -> impl Future<Output = std::result::Result<Vec<ProductId>, ApiError>> + Send {
        Self::remove_from_wishlist(self, product)
    }
}

/// The signed-in user's wishlist as full products.
pub struct WishlistCache<B> {
    inner: Arc<WishlistCacheInner<B>>,
}

struct WishlistCacheInner<B> {
    backend: B,
    gate: AuthGate,
    cell: CacheCell<Vec<Product>>,
}

impl<B> Clone for WishlistCache<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: WishlistBackend> WishlistCache<B> {
    #[must_use]
    pub fn new(backend: B, gate: AuthGate) -> Self {
        Self {
            inner: Arc::new(WishlistCacheInner {
                backend,
                gate,
                cell: CacheCell::default(),
            }),
        }
    }

    pub async fn snapshot(&self) -> Snapshot<Vec<Product>> {
        self.inner.cell.snapshot().await
    }

    pub async fn items(&self) -> Vec<Product> {
        self.inner.cell.read(Clone::clone).await
    }

    pub async fn count(&self) -> usize {
        self.inner.cell.read(Vec::len).await
    }

    /// Whether a product is on the wishlist under either id variant.
    pub async fn contains(&self, product: &ProductId) -> bool {
        self.inner
            .cell
            .read(|items| items.iter().any(|p| p.matches_id(product)))
            .await
    }

    /// Load the wishlist. Signed-out users get an empty list and no request
    /// is made.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cached list is kept and the error flag
    /// set.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<()> {
        let _op = self.inner.cell.lock().await;
        self.fetch_locked().await
    }

    async fn fetch_locked(&self) -> Result<()> {
        let cell = &self.inner.cell;
        if !self.inner.gate.is_authenticated() {
            cell.begin().await;
            cell.finish(Vec::clear).await;
            return Ok(());
        }

        cell.begin().await;
        match self.inner.backend.get_wishlist().await {
            Ok(fresh) => {
                cell.finish(|items| *items = fresh).await;
                Ok(())
            }
            Err(err) => {
                cell.fail(LOAD_FAILED, &err, |_| {}).await;
                Err(err.into())
            }
        }
    }

    /// Add a product, then reload the whole list.
    ///
    /// The mutation answers with ids only, so the refetch is what brings in
    /// the full product.
    ///
    /// # Errors
    ///
    /// Returns the upstream error from either call.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn add(&self, product: &ProductId) -> Result<()> {
        let _op = self.inner.cell.lock().await;
        self.add_locked(product).await
    }

    async fn add_locked(&self, product: &ProductId) -> Result<()> {
        self.inner.cell.begin().await;
        if let Err(err) = self.inner.backend.add_to_wishlist(product).await {
            self.inner.cell.fail(ADD_FAILED, &err, |_| {}).await;
            return Err(err.into());
        }
        add_breadcrumb("wishlist", "Added item", Some(&[("product_id", product.as_str())]));
        self.fetch_locked().await
    }

    /// Remove a product, then drop it locally without refetching.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cached list is left unchanged.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn remove(&self, product: &ProductId) -> Result<()> {
        let _op = self.inner.cell.lock().await;
        self.remove_locked(product).await
    }

    async fn remove_locked(&self, product: &ProductId) -> Result<()> {
        let cell = &self.inner.cell;
        cell.begin().await;
        match self.inner.backend.remove_from_wishlist(product).await {
            Ok(_) => {
                cell.finish(|items| items.retain(|p| !p.matches_id(product)))
                    .await;
                Ok(())
            }
            Err(err) => {
                cell.fail(REMOVE_FAILED, &err, |_| {}).await;
                Err(err.into())
            }
        }
    }

    /// Add if absent, remove if present. The membership check and the
    /// mutation run under one operation lock.
    ///
    /// # Errors
    ///
    /// See [`Self::add`] and [`Self::remove`].
    #[instrument(skip(self), fields(product = %product))]
    pub async fn toggle(&self, product: &ProductId) -> Result<bool> {
        let _op = self.inner.cell.lock().await;
        let present = self
            .inner
            .cell
            .read(|items| items.iter().any(|p| p.matches_id(product)))
            .await;
        if present {
            self.remove_locked(product).await.map(|()| false)
        } else {
            self.add_locked(product).await.map(|()| true)
        }
    }

    /// Forget the cached list, as on sign-out.
    pub async fn reset(&self) {
        let _op = self.inner.cell.lock().await;
        self.inner.cell.reset().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bazaar_core::Price;

    use super::*;
    use crate::cache::cart::tests::{signed_in_gate, signed_in_store};

    fn product(id: &str, alt: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            alt_id: alt.map(ProductId::new),
            title: id.to_string(),
            slug: id.to_string(),
            description: String::new(),
            stock: 1,
            price: Price::from_units(10),
            price_after_discount: None,
            sold: None,
            image_cover: None,
            images: vec![],
            category: None,
            brand: None,
            subcategories: vec![],
            ratings_average: 0.0,
            ratings_quantity: 0,
            created_at: None,
        }
    }

    #[derive(Default)]
    struct ScriptedWishlist {
        lists: Mutex<VecDeque<Vec<Product>>>,
        fail_mutations: bool,
        gets: AtomicUsize,
        mutations: AtomicUsize,
    }

    impl ScriptedWishlist {
        fn then(self, list: Vec<Product>) -> Self {
            self.lists.lock().unwrap().push_back(list);
            self
        }

        fn mutate(&self) -> std::result::Result<Vec<ProductId>, ApiError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            if self.fail_mutations {
                Err(ApiError::Status {
                    status: 500,
                    message: "down".to_string(),
                })
            } else {
                Ok(vec![])
            }
        }
    }

    impl WishlistBackend for ScriptedWishlist {
        async fn get_wishlist(&self) -> std::result::Result<Vec<Product>, ApiError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.lists
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(ApiError::MissingData("scripted list"))
        }

        async fn add_to_wishlist(
            &self,
            _: &ProductId,
        ) -> std::result::Result<Vec<ProductId>, ApiError> {
            self.mutate()
        }

        async fn remove_from_wishlist(
            &self,
            _: &ProductId,
        ) -> std::result::Result<Vec<ProductId>, ApiError> {
            self.mutate()
        }
    }

    #[tokio::test]
    async fn test_contains_honors_both_id_variants() {
        let backend = ScriptedWishlist::default().then(vec![product("p1", Some("legacy-1"))]);
        let cache = WishlistCache::new(backend, signed_in_gate());
        cache.fetch().await.unwrap();

        assert!(cache.contains(&ProductId::new("p1")).await);
        assert!(cache.contains(&ProductId::new("legacy-1")).await);
        assert!(!cache.contains(&ProductId::new("p2")).await);
    }

    #[tokio::test]
    async fn test_add_refetches() {
        let backend = ScriptedWishlist::default()
            .then(vec![])
            .then(vec![product("p1", None)]);
        let cache = WishlistCache::new(backend, signed_in_gate());

        cache.fetch().await.unwrap();
        cache.add(&ProductId::new("p1")).await.unwrap();

        assert_eq!(cache.count().await, 1);
        assert_eq!(cache.inner.backend.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remove_filters_locally_by_either_id() {
        let backend = ScriptedWishlist::default()
            .then(vec![product("p1", Some("legacy-1")), product("p2", None)]);
        let cache = WishlistCache::new(backend, signed_in_gate());

        cache.fetch().await.unwrap();
        cache.remove(&ProductId::new("legacy-1")).await.unwrap();

        let ids: Vec<String> = cache.items().await.into_iter().map(|p| p.id.into_inner()).collect();
        assert_eq!(ids, vec!["p2".to_string()]);
        assert_eq!(cache.inner.backend.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_add_flags_error_without_refetch() {
        let backend = ScriptedWishlist {
            fail_mutations: true,
            ..ScriptedWishlist::default()
        }
        .then(vec![product("p1", None)]);
        let cache = WishlistCache::new(backend, signed_in_gate());

        cache.fetch().await.unwrap();
        assert!(cache.add(&ProductId::new("p2")).await.is_err());

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.error.as_deref(), Some(ADD_FAILED));
        assert_eq!(snapshot.value.len(), 1);
        assert_eq!(cache.inner.backend.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_list() {
        let backend = ScriptedWishlist::default().then(vec![product("p1", None)]);
        let cache = WishlistCache::new(backend, signed_in_gate());

        cache.fetch().await.unwrap();
        // Script exhausted: the next fetch fails.
        assert!(cache.fetch().await.is_err());

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.value.len(), 1);
        assert_eq!(snapshot.error.as_deref(), Some(LOAD_FAILED));
    }

    #[tokio::test]
    async fn test_toggle() {
        let backend = ScriptedWishlist::default()
            .then(vec![])
            .then(vec![product("p1", None)]);
        let cache = WishlistCache::new(backend, signed_in_gate());
        cache.fetch().await.unwrap();

        assert!(cache.toggle(&ProductId::new("p1")).await.unwrap());
        assert!(!cache.toggle(&ProductId::new("p1")).await.unwrap());
        assert_eq!(cache.count().await, 0);
        assert_eq!(cache.inner.backend.mutations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_toggles_do_not_both_add() {
        let backend = ScriptedWishlist::default()
            .then(vec![])
            .then(vec![product("p1", None)]);
        let cache = WishlistCache::new(backend, signed_in_gate());
        cache.fetch().await.unwrap();

        let id = ProductId::new("p1");
        let (first, second) = tokio::join!(cache.toggle(&id), cache.toggle(&id));

        assert_ne!(first.unwrap(), second.unwrap());
        assert_eq!(cache.count().await, 0);
        assert_eq!(cache.inner.backend.mutations.load(Ordering::SeqCst), 2);
        assert_eq!(cache.inner.backend.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_signed_out_fetch_clears_stale_error() {
        let store = signed_in_store();
        let gate = AuthGate::new(store.clone());
        let cache = WishlistCache::new(ScriptedWishlist::default(), gate.clone());

        assert!(cache.fetch().await.is_err());
        assert_eq!(cache.snapshot().await.error.as_deref(), Some(LOAD_FAILED));

        store.clear().unwrap();
        gate.recheck();
        cache.fetch().await.unwrap();

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.error, None);
        assert!(snapshot.value.is_empty());
    }
}
