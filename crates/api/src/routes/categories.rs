//! Category route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use meridian_core::MainCategoryId;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::CategoryRepository;
use crate::models::category::{CategoryTreeNode, SubCategoryView};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MainCategoryView {
    id: Option<MainCategoryId>,
    name: String,
    description: Option<String>,
}

/// `GET /api/categories` - the full two-level tree.
pub async fn tree(State(state): State<AppState>) -> Result<Json<Vec<CategoryTreeNode>>> {
    let categories = CategoryRepository::new(state.store(), state.storage());
    Ok(Json(categories.tree().await?))
}

/// `GET /api/categories/main`
pub async fn main_categories(State(state): State<AppState>) -> Result<Json<Vec<MainCategoryView>>> {
    let categories = CategoryRepository::new(state.store(), state.storage());
    let mains = categories.all_main().await?;

    Ok(Json(
        mains
            .into_iter()
            .map(|main| MainCategoryView {
                id: main.id,
                name: main.name,
                description: main.description,
            })
            .collect(),
    ))
}

/// `GET /api/categories/main/{id}/subcategories`
pub async fn subcategories_of_main(
    State(state): State<AppState>,
    Path(id): Path<MainCategoryId>,
) -> Result<Json<Vec<SubCategoryView>>> {
    let categories = CategoryRepository::new(state.store(), state.storage());
    if categories.get_main(&id).await?.is_none() {
        return Err(AppError::NotFound("category not found".to_owned()));
    }

    let subs = categories.subcategories_of(&id).await?;
    Ok(Json(subs.iter().map(SubCategoryView::from).collect()))
}
