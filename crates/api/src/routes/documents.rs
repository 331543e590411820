//! Document route handlers.
//!
//! The download endpoint delegates to the gated resolver: it accepts either
//! a bearer header or a `token` query parameter, so plain anchor-tag
//! downloads work for logged-in clients that cannot set headers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Redirect,
};
use meridian_core::DocumentId;
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::{OptionalUser, RequireUser};
use crate::middleware::auth::bearer_token;
use crate::models::document::DocumentListing;
use crate::models::{Document, DocumentRepository};
use crate::services::DownloadResolver;
use crate::state::AppState;

/// `GET /api/documents` - everything the caller may see: public documents
/// always, gated ones too when a valid bearer is presented.
pub async fn combined_listing(
    State(state): State<AppState>,
    OptionalUser(claims): OptionalUser,
) -> Result<Json<Vec<DocumentListing>>> {
    let documents = DocumentRepository::new(state.store(), state.storage());
    let mut listed = documents.public().await?;
    if claims.is_some() {
        listed.extend(documents.private().await?);
    }
    Ok(Json(listed.iter().map(Document::listing).collect()))
}

/// `GET /api/documents/public`
pub async fn public_listing(State(state): State<AppState>) -> Result<Json<Vec<DocumentListing>>> {
    let documents = DocumentRepository::new(state.store(), state.storage());
    let listed = documents.public().await?;
    Ok(Json(listed.iter().map(Document::listing).collect()))
}

/// `GET /api/documents/private` - gated listing, bearer required.
pub async fn private_listing(
    State(state): State<AppState>,
    RequireUser(_claims): RequireUser,
) -> Result<Json<Vec<DocumentListing>>> {
    let documents = DocumentRepository::new(state.store(), state.storage());
    let listed = documents.private().await?;
    Ok(Json(listed.iter().map(Document::listing).collect()))
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    token: Option<String>,
}

/// `GET /api/documents/download/{id}?token=`
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let resolver = DownloadResolver::new(state.store(), state.storage(), state.tokens());
    let url = resolver
        .resolve(&id, bearer_token(&headers), params.token.as_deref())
        .await?;
    Ok(Redirect::temporary(&url))
}
