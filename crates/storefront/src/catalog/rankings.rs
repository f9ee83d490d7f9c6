//! Home page product selections and filter facets.

use crate::api::types::Product;

/// Distinct category and brand names, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub categories: Vec<String>,
    pub brands: Vec<String>,
}

#[must_use]
pub fn facets(products: &[Product]) -> Facets {
    let mut facets = Facets::default();
    for product in products {
        if let Some(name) = product.category_name()
            && !facets.categories.iter().any(|c| c == name)
        {
            facets.categories.push(name.to_string());
        }
        if let Some(name) = product.brand_name()
            && !facets.brands.iter().any(|b| b == name)
        {
            facets.brands.push(name.to_string());
        }
    }
    facets
}

/// Best sellers by units sold. When fewer than `n` products have sales, the
/// highest rated products are shown instead.
#[must_use]
pub fn top_selling(products: &[Product], n: usize) -> Vec<&Product> {
    let mut selling: Vec<&Product> = products
        .iter()
        .filter(|p| p.sold.is_some_and(|sold| sold > 0))
        .collect();
    if selling.len() >= n {
        selling.sort_by(|a, b| b.sold.cmp(&a.sold));
        selling.truncate(n);
        return selling;
    }

    let mut rated: Vec<&Product> = products.iter().collect();
    rated.sort_by(|a, b| b.ratings_average.total_cmp(&a.ratings_average));
    rated.truncate(n);
    rated
}

/// Most recently created products. Undated products come last.
#[must_use]
pub fn new_arrivals(products: &[Product], n: usize) -> Vec<&Product> {
    let mut newest: Vec<&Product> = products.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    newest.truncate(n);
    newest
}
