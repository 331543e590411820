//! Product route handlers.
//!
//! Listing endpoints serve summaries: the product's own fields plus its
//! resolved main image and, depending on the endpoint, the owning category
//! names. Image bytes are never proxied; the image endpoint redirects to the
//! stored URL.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use meridian_core::{MainCategoryId, Price, ProductId, ProductImageId, SubCategoryId};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{CategoryRepository, Product, ProductRepository};
use crate::state::AppState;

/// Cap on the featured listing.
const FEATURED_LIMIT: usize = 6;

#[derive(Debug, Serialize)]
pub struct ProductSummary {
    id: Option<ProductId>,
    name: String,
    model: Option<String>,
    price: Option<f64>,
    description: Option<String>,
    has_image: bool,
    image_id: Option<ProductImageId>,
    image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_category_id: Option<SubCategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    main_category_id: Option<MainCategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    main_category_name: Option<String>,
}

/// How much category context a summary carries.
#[derive(Clone, Copy, PartialEq, Eq)]
enum CategoryContext {
    /// No category fields (subcategory listings - the caller already knows).
    None,
    /// Subcategory id and name.
    Sub,
    /// Subcategory and main category.
    Full,
}

/// Assemble the summary for one product: resolve its main image and,
/// per `context`, the owning category names.
async fn summarize(
    state: &AppState,
    product: Product,
    context: CategoryContext,
) -> Result<ProductSummary> {
    let products = ProductRepository::new(state.store(), state.storage());
    let main_image = match &product.id {
        Some(id) => products.main_image(id).await?,
        None => None,
    };

    let mut sub_category_id = None;
    let mut sub_category_name = None;
    let mut main_category_id = None;
    let mut main_category_name = None;

    if context != CategoryContext::None {
        let categories = CategoryRepository::new(state.store(), state.storage());
        sub_category_id = Some(product.sub_category_id.clone());

        if let Some(sub) = categories.get_sub(&product.sub_category_id).await? {
            sub_category_name = Some(sub.name);

            if context == CategoryContext::Full {
                if let Some(main) = categories.get_main(&sub.main_category_id).await? {
                    main_category_id = main.id;
                    main_category_name = Some(main.name);
                }
            }
        }
    }

    Ok(ProductSummary {
        id: product.id,
        name: product.name,
        model: product.model,
        price: product.price.map(Price::as_f64),
        description: product.description,
        has_image: main_image.is_some(),
        image_id: main_image.as_ref().and_then(|image| image.id.clone()),
        image_url: main_image.and_then(|image| image.image_url),
        sub_category_id,
        sub_category_name,
        main_category_id,
        main_category_name,
    })
}

async fn summarize_all(
    state: &AppState,
    products: Vec<Product>,
    context: CategoryContext,
) -> Result<Vec<ProductSummary>> {
    let mut summaries = Vec::with_capacity(products.len());
    for product in products {
        summaries.push(summarize(state, product, context).await?);
    }
    Ok(summaries)
}

/// `GET /api/products/featured` - up to six featured products.
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<ProductSummary>>> {
    let products = ProductRepository::new(state.store(), state.storage());
    let mut featured = products.featured().await?;
    featured.truncate(FEATURED_LIMIT);

    Ok(Json(
        summarize_all(&state, featured, CategoryContext::Full).await?,
    ))
}

/// `GET /api/products/category/main/{id}` - products across every
/// subcategory of one main category.
pub async fn by_main_category(
    State(state): State<AppState>,
    Path(id): Path<MainCategoryId>,
) -> Result<Json<Vec<ProductSummary>>> {
    let categories = CategoryRepository::new(state.store(), state.storage());
    let subs = categories.subcategories_of(&id).await?;

    let sub_ids: Vec<SubCategoryId> = subs.into_iter().filter_map(|sub| sub.id).collect();
    if sub_ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let products = ProductRepository::new(state.store(), state.storage());
    let matched = products.by_subcategories(&sub_ids).await?;

    Ok(Json(
        summarize_all(&state, matched, CategoryContext::Sub).await?,
    ))
}

/// `GET /api/products/category/sub/{id}`
pub async fn by_sub_category(
    State(state): State<AppState>,
    Path(id): Path<SubCategoryId>,
) -> Result<Json<Vec<ProductSummary>>> {
    let products = ProductRepository::new(state.store(), state.storage());
    let matched = products.by_subcategory(&id).await?;

    Ok(Json(
        summarize_all(&state, matched, CategoryContext::None).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// `GET /api/products/search?q=` - substring search. An empty or missing
/// query answers an empty list without touching the store.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ProductSummary>>> {
    let query = params.q.unwrap_or_default();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let products = ProductRepository::new(state.store(), state.storage());
    let hits = products.search(&query).await?;

    Ok(Json(
        summarize_all(&state, hits, CategoryContext::Sub).await?,
    ))
}

#[derive(Debug, Serialize)]
pub struct ProductImageDetail {
    id: Option<ProductImageId>,
    url: Option<String>,
    is_main: bool,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    id: Option<ProductId>,
    name: String,
    model: Option<String>,
    price: Option<f64>,
    description: Option<String>,
    specifications: Option<String>,
    sub_category_id: SubCategoryId,
    sub_category_name: Option<String>,
    main_category_id: Option<MainCategoryId>,
    main_category_name: Option<String>,
    images: Vec<ProductImageDetail>,
}

/// `GET /api/products/{id}` - full detail with every image.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    let products = ProductRepository::new(state.store(), state.storage());
    let product = products
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;

    let images = products
        .images_of(&id)
        .await?
        .into_iter()
        .map(|image| ProductImageDetail {
            id: image.id,
            url: image.image_url,
            is_main: image.is_main,
        })
        .collect();

    let categories = CategoryRepository::new(state.store(), state.storage());
    let sub = categories.get_sub(&product.sub_category_id).await?;
    let main = match &sub {
        Some(sub) => categories.get_main(&sub.main_category_id).await?,
        None => None,
    };

    Ok(Json(ProductDetail {
        id: product.id,
        name: product.name,
        model: product.model,
        price: product.price.map(Price::as_f64),
        description: product.description,
        specifications: product.specifications,
        sub_category_id: product.sub_category_id,
        sub_category_name: sub.map(|s| s.name),
        main_category_id: main.as_ref().and_then(|m| m.id.clone()),
        main_category_name: main.map(|m| m.name),
        images,
    }))
}

/// `GET /api/products/image/{id}` - redirect to the stored image URL.
pub async fn image_redirect(
    State(state): State<AppState>,
    Path(id): Path<ProductImageId>,
) -> Result<Redirect> {
    let products = ProductRepository::new(state.store(), state.storage());
    let image = products
        .get_image(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("image not found".to_owned()))?;

    let url = image
        .image_url
        .ok_or_else(|| AppError::NotFound("image has no stored URL".to_owned()))?;
    Ok(Redirect::temporary(&url))
}
