//! Product catalog: a cached product list plus filtered, sorted and
//! paginated views over it.
//!
//! The upstream listing is loaded once and cached using `moka` with the
//! configured TTL. Filtering, sorting and pagination are pure functions over
//! the loaded list and never touch the network.

mod cache;
pub mod filter;
pub mod pagination;
pub mod rankings;

pub use filter::{DEFAULT_MAX_PRICE, ParseSortOrderError, ProductFilter, SortOrder};
pub use pagination::{DEFAULT_PAGE_SIZE, Pages, paginate};
pub use rankings::{Facets, facets, new_arrivals, top_selling};

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use bazaar_core::ProductId;
use moka::future::Cache;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::api::types::{Product, ProductPage};
use crate::api::{ApiClient, ApiError};
use crate::error::Result;
use cache::{CacheKey, CacheValue};

// =============================================================================
// Catalog
// =============================================================================

/// Catalog operations the cache needs from the upstream.
pub trait CatalogBackend: Send + Sync + 'static {
    fn list_products(
        &self,
    ) -> impl Future<Output = std::result::Result<ProductPage, ApiError>> + Send;

    fn get_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = std::result::Result<Product, ApiError>> + Send;
}

impl CatalogBackend for ApiClient {
    fn list_products(
        &self,
    ) -> impl Future<Output = std::result::Result<ProductPage, ApiError>> + Send {
        Self::list_products(self)
    }

    fn get_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = std::result::Result<Product, ApiError>> + Send {
        Self::get_product(self, id)
    }
}

/// The product catalog, cached for the configured TTL.
pub struct Catalog<B> {
    inner: Arc<CatalogInner<B>>,
}

struct CatalogInner<B> {
    backend: B,
    cache: Cache<CacheKey, CacheValue>,
}

impl<B> Clone for Catalog<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CatalogBackend> Catalog<B> {
    #[must_use]
    pub fn new(backend: B, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CatalogInner { backend, cache }),
        }
    }

    /// The full product list.
    ///
    /// # Errors
    ///
    /// Returns the upstream error on a cache miss that fails to load.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<[Product]>> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let page = self.inner.backend.list_products().await?;
        let products: Arc<[Product]> = page.products.into();
        debug!(count = products.len(), results = page.results, "Loaded product list");

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// One product, from the cache, the cached list, or the upstream.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
            && let Some(product) = products.iter().find(|p| p.matches_id(id))
        {
            debug!("Found product in cached list");
            return Ok(product.clone());
        }

        let product = self.inner.backend.get_product(id).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Drop everything cached.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
    }
}

// =============================================================================
// Browsing
// =============================================================================

/// Filter, sort and page state for a product listing.
///
/// Changing any filter input or the sort order goes back to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductBrowser {
    filter: ProductFilter,
    sort: SortOrder,
    page: usize,
    page_size: NonZeroUsize,
}

/// One rendered page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseView<'a> {
    pub products: Vec<&'a Product>,
    /// The page shown, clamped into range.
    pub page: usize,
    pub page_count: usize,
    /// Products matching the filter across all pages.
    pub total: usize,
}

impl Default for ProductBrowser {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ProductBrowser {
    #[must_use]
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            filter: ProductFilter::default(),
            sort: SortOrder::default(),
            page: 1,
            page_size,
        }
    }

    #[must_use]
    pub const fn filter(&self) -> &ProductFilter {
        &self.filter
    }

    #[must_use]
    pub const fn sort(&self) -> SortOrder {
        self.sort
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    pub fn set_filter(&mut self, filter: ProductFilter) {
        self.filter = filter;
        self.page = 1;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
        self.page = 1;
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.filter.category = category;
        self.page = 1;
    }

    pub fn set_brand(&mut self, brand: Option<String>) {
        self.filter.brand = brand;
        self.page = 1;
    }

    pub fn set_max_price(&mut self, max_price: Decimal) {
        self.filter.max_price = max_price;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: NonZeroUsize) {
        self.page_size = page_size;
        self.page = 1;
    }

    pub const fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn clear_filters(&mut self) {
        self.set_filter(ProductFilter::default());
    }

    /// Filter, sort and slice out the current page.
    #[must_use]
    pub fn view<'a>(&self, products: &'a [Product]) -> BrowseView<'a> {
        let mut matching = self.filter.apply(products);
        self.sort.sort(&mut matching);

        let pages = paginate(&matching, self.page_size);
        let page = pages.clamp_page(self.page);
        BrowseView {
            products: pages.page(page).to_vec(),
            page,
            page_count: pages.page_count(),
            total: pages.total(),
        }
    }
}
