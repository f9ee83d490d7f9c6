//! Product conversion functions.

use bazaar_core::{BrandId, CategoryId, Price, ProductId};
use tracing::warn;

use super::{canonical_ids, count_from};
use crate::api::types::{Brand, Category, PageInfo, Product, ProductPage};
use crate::api::wire::{RawNamed, RawProduct, RawProductList};

fn convert_category(raw: RawNamed) -> Option<Category> {
    let (id, _) = canonical_ids(raw.mongo_id, raw.id)?;
    Some(Category {
        id: CategoryId::new(id),
        name: raw.name,
        slug: raw.slug,
        image: raw.image,
    })
}

fn convert_brand(raw: RawNamed) -> Option<Brand> {
    let (id, _) = canonical_ids(raw.mongo_id, raw.id)?;
    Some(Brand {
        id: BrandId::new(id),
        name: raw.name,
        slug: raw.slug,
        image: raw.image,
    })
}

/// Convert a raw product. Returns `None` when neither id variant is present.
pub fn convert_product(raw: RawProduct) -> Option<Product> {
    let Some((id, alt_id)) = canonical_ids(raw.mongo_id, raw.id) else {
        warn!(title = %raw.title, "Dropping product without an id");
        return None;
    };

    Some(Product {
        id: ProductId::new(id),
        alt_id: alt_id.map(ProductId::new),
        title: raw.title,
        slug: raw.slug,
        description: raw.description,
        stock: count_from(raw.quantity),
        price: raw.price.unwrap_or(Price::ZERO),
        price_after_discount: raw.price_after_discount,
        sold: raw.sold.map(|n| count_from(Some(n))),
        image_cover: raw.image_cover.filter(|s| !s.is_empty()),
        images: raw.images,
        category: raw.category.and_then(convert_category),
        brand: raw.brand.and_then(convert_brand),
        subcategories: raw
            .subcategory
            .into_iter()
            .map(|s| s.name)
            .filter(|name| !name.is_empty())
            .collect(),
        ratings_average: raw.ratings_average.unwrap_or(0.0),
        ratings_quantity: count_from(raw.ratings_quantity),
        created_at: raw.created_at,
    })
}

/// Convert a product listing, falling back to the list length when the
/// upstream omits counts.
pub fn convert_product_page(raw: RawProductList) -> ProductPage {
    let products: Vec<Product> = raw.data.into_iter().filter_map(convert_product).collect();
    let results = raw
        .results
        .unwrap_or_else(|| u32::try_from(products.len()).unwrap_or(u32::MAX));

    ProductPage {
        page_info: PageInfo {
            current_page: raw.metadata.current_page.unwrap_or(1),
            number_of_pages: raw.metadata.number_of_pages.unwrap_or(1),
            limit: raw.metadata.limit.unwrap_or(results),
            next_page: raw.metadata.next_page,
        },
        results,
        products,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_full_product() {
        let raw: RawProduct = serde_json::from_value(serde_json::json!({
            "sold": null,
            "images": ["a.jpg"],
            "subcategory": [{"_id": "s1", "name": "Tops", "slug": "tops", "category": "c1"}],
            "ratingsQuantity": 12,
            "_id": "6428ebc6",
            "title": "Linen Shirt",
            "slug": "linen-shirt",
            "description": "Breathable",
            "quantity": 40,
            "price": 149,
            "priceAfterDiscount": 119.5,
            "imageCover": "cover.jpg",
            "category": {"_id": "c1", "name": "Men's Fashion", "slug": "men", "image": "men.png"},
            "brand": {"_id": "b1", "name": "DeFacto", "slug": "defacto", "image": "d.png"},
            "ratingsAverage": 4.3,
            "createdAt": "2023-04-02T02:11:50.000Z",
            "id": "6428ebc6"
        }))
        .unwrap();

        let product = convert_product(raw).unwrap();
        assert_eq!(product.id.as_str(), "6428ebc6");
        assert_eq!(product.alt_id, None);
        assert_eq!(product.sold, None);
        assert_eq!(product.stock, 40);
        assert_eq!(product.effective_price(), Price::from_cents(11950));
        assert_eq!(product.category_name(), Some("Men's Fashion"));
        assert_eq!(product.brand_name(), Some("DeFacto"));
        assert_eq!(product.subcategories, vec!["Tops".to_string()]);
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_convert_product_without_id_is_dropped() {
        let raw: RawProduct = serde_json::from_value(serde_json::json!({"title": "ghost"})).unwrap();
        assert!(convert_product(raw).is_none());
    }

    #[test]
    fn test_convert_page_defaults_metadata() {
        let raw: RawProductList = serde_json::from_value(serde_json::json!({
            "data": [{"id": "p1", "title": "A", "price": 10}, {"title": "no id"}]
        }))
        .unwrap();

        let page = convert_product_page(raw);
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.results, 1);
        assert_eq!(page.page_info.current_page, 1);
        assert_eq!(page.page_info.next_page, None);
    }
}
