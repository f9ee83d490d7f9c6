//! Product filtering and sorting over an already-loaded product list.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::api::types::Product;

/// Upper bound of the price filter when none is set.
pub const DEFAULT_MAX_PRICE: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

/// Filter inputs. A product passes when every active predicate holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the title or the description.
    pub query: String,
    /// Exact category name.
    pub category: Option<String>,
    /// Exact brand name.
    pub brand: Option<String>,
    /// Inclusive upper bound on the effective price. The lower bound is zero.
    pub max_price: Decimal,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: None,
            brand: None,
            max_price: DEFAULT_MAX_PRICE,
        }
    }
}

impl ProductFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_query(product)
            && self
                .category
                .as_deref()
                .is_none_or(|name| product.category_name() == Some(name))
            && self
                .brand
                .as_deref()
                .is_none_or(|name| product.brand_name() == Some(name))
            && self.matches_price(product)
    }

    fn matches_query(&self, product: &Product) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        product.title.to_lowercase().contains(&needle)
            || product.description.to_lowercase().contains(&needle)
    }

    fn matches_price(&self, product: &Product) -> bool {
        let price = product.effective_price().amount;
        price >= Decimal::ZERO && price <= self.max_price
    }

    /// Products passing the filter, in source order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    /// Whether any predicate narrows the list.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }
}

/// Listing order. Every order is a stable sort, so ties keep source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Source order.
    #[default]
    Featured,
    PriceLowHigh,
    PriceHighLow,
    Newest,
    TopRated,
}

impl SortOrder {
    pub const ALL: [Self; 5] = [
        Self::Featured,
        Self::PriceLowHigh,
        Self::PriceHighLow,
        Self::Newest,
        Self::TopRated,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceLowHigh => "price-asc",
            Self::PriceHighLow => "price-desc",
            Self::Newest => "newest",
            Self::TopRated => "top-rated",
        }
    }

    /// Sort in place. Prices compare on the effective (discounted) price.
    pub fn sort(self, products: &mut [&Product]) {
        match self {
            Self::Featured => {}
            Self::PriceLowHigh => {
                products.sort_by_key(|p| p.effective_price().amount);
            }
            Self::PriceHighLow => {
                products.sort_by(|a, b| b.effective_price().amount.cmp(&a.effective_price().amount));
            }
            // Undated products sort last.
            Self::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::TopRated => {
                products.sort_by(|a, b| b.ratings_average.total_cmp(&a.ratings_average));
            }
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized sort order name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort order '{0}' (expected featured, price-asc, price-desc, newest or top-rated)")]
pub struct ParseSortOrderError(String);

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseSortOrderError(s.to_string()))
    }
}
