//! Carousel route handlers.

use axum::{
    Json,
    extract::{Path, State},
    response::Redirect,
};
use meridian_core::CarouselId;

use crate::error::{AppError, Result};
use crate::models::carousel::CarouselView;
use crate::models::{Carousel, CarouselRepository};
use crate::state::AppState;

/// `GET /api/carousel` - active entries in rotation order.
pub async fn active(State(state): State<AppState>) -> Result<Json<Vec<CarouselView>>> {
    let carousels = CarouselRepository::new(state.store(), state.storage());
    let entries = carousels.active_ordered().await?;
    Ok(Json(entries.iter().map(Carousel::view).collect()))
}

/// `GET /api/carousel/image/{id}` - redirect to the banner URL.
pub async fn image_redirect(
    State(state): State<AppState>,
    Path(id): Path<CarouselId>,
) -> Result<Redirect> {
    let carousels = CarouselRepository::new(state.store(), state.storage());
    let entry = carousels
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("carousel entry not found".to_owned()))?;

    let url = entry
        .image_url
        .ok_or_else(|| AppError::NotFound("carousel entry has no image".to_owned()))?;
    Ok(Redirect::temporary(&url))
}
