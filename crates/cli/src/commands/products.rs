//! Catalog commands.

use bazaar_core::ProductId;
use bazaar_storefront::api::types::Product;
use bazaar_storefront::catalog::{ProductBrowser, facets, new_arrivals, top_selling};
use bazaar_storefront::{AppError, Storefront};
use tracing::info;

use crate::{ListArgs, ProductsAction};

pub async fn run(storefront: &Storefront, action: ProductsAction) -> Result<(), AppError> {
    match action {
        ProductsAction::List(args) => list(storefront, args).await,
        ProductsAction::Show { id } => show(storefront, &ProductId::new(id)).await,
        ProductsAction::Top { count } => {
            let products = storefront.catalog().products().await?;
            info!("Top selling");
            top_selling(&products, count).into_iter().for_each(log_product);
            Ok(())
        }
        ProductsAction::New { count } => {
            let products = storefront.catalog().products().await?;
            info!("New arrivals");
            new_arrivals(&products, count).into_iter().for_each(log_product);
            Ok(())
        }
    }
}

async fn list(storefront: &Storefront, args: ListArgs) -> Result<(), AppError> {
    let products = storefront.catalog().products().await?;

    let mut browser =
        ProductBrowser::new(args.page_size.unwrap_or(storefront.config().page_size));
    browser.set_query(args.query);
    browser.set_category(args.category);
    browser.set_brand(args.brand);
    if let Some(max_price) = args.max_price {
        browser.set_max_price(max_price);
    }
    browser.set_sort(args.sort);
    browser.set_page(args.page);

    let view = browser.view(&products);
    if view.total == 0 {
        let facets = facets(&products);
        info!("No products match");
        info!("Categories: {}", facets.categories.join(", "));
        info!("Brands: {}", facets.brands.join(", "));
        return Ok(());
    }

    info!(
        "Page {} of {} ({} products, sorted by {})",
        view.page,
        view.page_count,
        view.total,
        browser.sort()
    );
    view.products.into_iter().for_each(log_product);
    Ok(())
}

async fn show(storefront: &Storefront, id: &ProductId) -> Result<(), AppError> {
    let product = storefront.catalog().product(id).await?;
    log_product(&product);
    if !product.description.is_empty() {
        info!("{}", product.description);
    }
    info!(
        "Category: {}, brand: {}",
        product.category_name().unwrap_or("-"),
        product.brand_name().unwrap_or("-")
    );
    info!(
        "Rating: {:.1} ({} reviews), {}",
        product.ratings_average,
        product.ratings_quantity,
        if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        }
    );
    Ok(())
}

fn log_product(product: &Product) {
    if product.is_discounted() {
        info!(
            "{}  {}  {} (was {})",
            product.id,
            product.title,
            product.effective_price(),
            product.price
        );
    } else {
        info!("{}  {}  {}", product.id, product.title, product.price);
    }
}
