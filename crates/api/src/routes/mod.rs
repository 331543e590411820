//! HTTP route handlers for the catalog API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (pings the store)
//!
//! # Auth
//! POST /api/auth/login                      - Password login, returns a bearer token
//! GET  /api/auth/me                         - Current user profile (bearer)
//! POST /api/auth/change-password            - Change password (bearer)
//!
//! # Categories
//! GET  /api/categories                      - Full two-level category tree
//! GET  /api/categories/main                 - Main categories only
//! GET  /api/categories/main/{id}/subcategories - Subcategories of one main category
//!
//! # Products
//! GET  /api/products/featured               - Up to 6 featured products
//! GET  /api/products/category/main/{id}     - Products across a main category
//! GET  /api/products/category/sub/{id}      - Products under a subcategory
//! GET  /api/products/search?q=              - Substring search (empty q -> [])
//! GET  /api/products/{id}                   - Product detail with images
//! GET  /api/products/image/{id}             - Redirect to the stored image URL
//!
//! # Carousel
//! GET  /api/carousel                        - Active entries in rotation order
//! GET  /api/carousel/image/{id}             - Redirect to the banner URL
//!
//! # Documents
//! GET  /api/documents                       - Public listing, plus gated docs with a bearer
//! GET  /api/documents/public                - Ungated document listing
//! GET  /api/documents/private               - Gated document listing (bearer)
//! GET  /api/documents/download/{id}?token=  - Resolve a download (redirect / 401 / 404)
//! ```

pub mod auth;
pub mod carousel;
pub mod categories;
pub mod documents;
pub mod products;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get, routing::post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/change-password", post(auth::change_password))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::tree))
        .route("/main", get(categories::main_categories))
        .route(
            "/main/{id}/subcategories",
            get(categories::subcategories_of_main),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/featured", get(products::featured))
        .route("/category/main/{id}", get(products::by_main_category))
        .route("/category/sub/{id}", get(products::by_sub_category))
        .route("/search", get(products::search))
        .route("/image/{id}", get(products::image_redirect))
        .route("/{id}", get(products::detail))
}

/// Create the carousel routes router.
pub fn carousel_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(carousel::active))
        .route("/image/{id}", get(carousel::image_redirect))
}

/// Create the document routes router.
pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(documents::combined_listing))
        .route("/public", get(documents::public_listing))
        .route("/private", get(documents::private_listing))
        .route("/download/{id}", get(documents::download))
}

/// Build the full application router.
#[must_use]
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api/categories", category_routes())
        .nest("/api/products", product_routes())
        .nest("/api/carousel", carousel_routes())
        .nest("/api/documents", document_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies store connectivity before returning OK.
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
