//! End-to-end tests driving the router over in-memory backends.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use meridian_api::config::AppConfig;
use meridian_api::models::{
    Carousel, CarouselRepository, Document, DocumentRepository, MainCategory, CategoryRepository,
    Product, ProductImage, ProductRepository, SubCategory,
};
use meridian_api::routes;
use meridian_api::services::{AuthService, TokenService};
use meridian_api::state::AppState;
use meridian_api::storage::memory::MemoryStorage;
use meridian_api::store::memory::MemoryStore;

const JWT_SECRET: &str = "kJ8#mQ2$xR9@pL4!wN7&zB3*vC6^yH1%";

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    storage: Arc<MemoryStorage>,
    tokens: TokenService,
}

fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        jwt_secret: secrecy::SecretString::from(JWT_SECRET),
        gcp: None,
        sentry_dsn: None,
    }
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(MemoryStorage::new());
    let config = test_config();
    let tokens = TokenService::new(&config.jwt_secret);

    let state = AppState::new(config, store.clone(), storage.clone());
    TestApp {
        app: routes::app(state),
        store,
        storage,
        tokens,
    }
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn get_with_bearer(app: &TestApp, uri: &str, token: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn post_json(app: &TestApp, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

/// Redirect responses carry the target in the Location header.
async fn location_of(app: &TestApp, uri: &str, token: Option<&str>) -> (StatusCode, Option<String>) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_owned());
    (response.status(), location)
}

async fn seed_user(app: &TestApp, username: &str, password: &str) {
    let auth = AuthService::new(app.store.as_ref(), &app.tokens);
    auth.register(username, password, None).await.unwrap();
}

/// A main category, one subcategory, and a product with a flagged main image.
async fn seed_catalog(app: &TestApp) -> (String, String, String, String) {
    let categories = CategoryRepository::new(app.store.as_ref(), app.storage.as_ref());
    let mut main = MainCategory::new("Tools", Some("Hand and power tools".to_owned()));
    let main_id = categories.save_main(&mut main).await.unwrap();

    let mut sub = SubCategory::new(main_id.clone(), "Drills", None);
    let sub_id = categories.save_sub(&mut sub).await.unwrap();

    let products = ProductRepository::new(app.store.as_ref(), app.storage.as_ref());
    let mut product = Product::new(sub_id.clone(), "Hammer Drill");
    product.model = Some("HD-500".to_owned());
    product.is_featured = true;
    let product_id = products.save(&mut product).await.unwrap();

    let url = products
        .upload_image_bytes(&product_id, vec![1, 2, 3], "image/jpeg")
        .await
        .unwrap();
    let mut image = ProductImage::new(product_id.clone(), Some(url), true);
    let image_id = products.save_image(&mut image).await.unwrap();

    (
        main_id.into_inner(),
        sub_id.into_inner(),
        product_id.into_inner(),
        image_id.into_inner(),
    )
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();

    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_and_me_flow() {
    let app = test_app();
    seed_user(&app, "alice", "correct horse").await;

    let (status, body) = post_json(
        &app,
        "/api/auth/login",
        &json!({ "username": "alice", "password": "correct horse" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_owned();
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = get_with_bearer(&app, "/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = test_app();
    seed_user(&app, "alice", "correct horse").await;

    let (status, body) = post_json(
        &app,
        "/api/auth/login",
        &json!({ "username": "alice", "password": "wrong horse" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_me_requires_bearer() {
    let app = test_app();

    let (status, _) = get(&app, "/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_with_bearer(&app, "/api/auth/me", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = test_app();
    seed_user(&app, "alice", "correct horse").await;

    let (_, body) = post_json(
        &app,
        "/api/auth/login",
        &json!({ "username": "alice", "password": "correct horse" }),
    )
    .await;
    let token = body["access_token"].as_str().unwrap().to_owned();

    let request = Request::builder()
        .uri("/api/auth/change-password")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            serde_json::to_vec(&json!({
                "old_password": "correct horse",
                "new_password": "battery staple",
            }))
            .unwrap(),
        ))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        &json!({ "username": "alice", "password": "battery staple" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_category_tree() {
    let app = test_app();
    let (main_id, sub_id, _, _) = seed_catalog(&app).await;

    let (status, body) = get(&app, "/api/categories").await;
    assert_eq!(status, StatusCode::OK);

    let tree = body.as_array().unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0]["id"], main_id);
    assert_eq!(tree[0]["subcategories"][0]["id"], sub_id);

    let (status, body) = get(&app, &format!("/api/categories/main/{main_id}/subcategories")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = get(&app, "/api/categories/main/no-such-id/subcategories").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_featured_products_carry_category_names() {
    let app = test_app();
    let (main_id, sub_id, product_id, image_id) = seed_catalog(&app).await;

    let (status, body) = get(&app, "/api/products/featured").await;
    assert_eq!(status, StatusCode::OK);

    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    let summary = &listed[0];
    assert_eq!(summary["id"], product_id);
    assert_eq!(summary["has_image"], true);
    assert_eq!(summary["image_id"], image_id);
    assert_eq!(summary["sub_category_id"], sub_id);
    assert_eq!(summary["sub_category_name"], "Drills");
    assert_eq!(summary["main_category_id"], main_id);
    assert_eq!(summary["main_category_name"], "Tools");
}

#[tokio::test]
async fn test_featured_product_without_images_lists_without_one() {
    let app = test_app();
    let (_, sub_id, _, _) = seed_catalog(&app).await;

    let products = ProductRepository::new(app.store.as_ref(), app.storage.as_ref());
    let mut bare = Product::new(sub_id.clone().into(), "Bare Bench");
    bare.is_featured = true;
    products.save(&mut bare).await.unwrap();

    let (status, body) = get(&app, "/api/products/featured").await;
    assert_eq!(status, StatusCode::OK);

    let listed = body.as_array().unwrap();
    let summary = listed
        .iter()
        .find(|s| s["name"] == "Bare Bench")
        .expect("bare product listed");
    assert_eq!(summary["has_image"], false);
    assert!(summary["image_id"].is_null());
    assert!(summary["image_url"].is_null());
}

#[tokio::test]
async fn test_products_by_category() {
    let app = test_app();
    let (main_id, sub_id, product_id, _) = seed_catalog(&app).await;

    let (status, body) = get(&app, &format!("/api/products/category/main/{main_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], product_id);

    let (status, body) = get(&app, &format!("/api/products/category/sub/{sub_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Main category with no subcategories answers an empty list.
    let (status, body) = get(&app, "/api/products/category/main/no-such-id").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_search_empty_query_short_circuits() {
    let app = test_app();
    seed_catalog(&app).await;

    let (status, body) = get(&app, "/api/products/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);

    let (status, body) = get(&app, "/api/products/search?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_search_matches_substring_case_insensitively() {
    let app = test_app();
    seed_catalog(&app).await;

    let (status, body) = get(&app, "/api/products/search?q=HAMMER").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Hammer Drill");

    let (status, body) = get(&app, "/api/products/search?q=nothing-matches").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_product_detail_and_missing_product() {
    let app = test_app();
    let (_, sub_id, product_id, image_id) = seed_catalog(&app).await;

    let (status, body) = get(&app, &format!("/api/products/{product_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Hammer Drill");
    assert_eq!(body["sub_category_id"], sub_id);
    assert_eq!(body["sub_category_name"], "Drills");
    assert_eq!(body["main_category_name"], "Tools");
    assert_eq!(body["images"].as_array().unwrap().len(), 1);
    assert_eq!(body["images"][0]["id"], image_id);

    let (status, _) = get(&app, "/api/products/no-such-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_image_redirects_to_stored_url() {
    let app = test_app();
    let (_, _, _, image_id) = seed_catalog(&app).await;

    let (status, location) =
        location_of(&app, &format!("/api/products/image/{image_id}"), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert!(location.unwrap().contains("/products/"));

    let (status, _) = location_of(&app, "/api/products/image/no-such-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_carousel_listing_is_ordered_and_filtered() {
    let app = test_app();
    let carousels = CarouselRepository::new(app.store.as_ref(), app.storage.as_ref());

    let mut second = Carousel::new("Second", 2);
    carousels.save(&mut second).await.unwrap();
    let mut first = Carousel::new("First", 1);
    first.image_url = Some("https://blobs.invalid/b/carousels/x.jpg".to_owned());
    let first_id = carousels.save(&mut first).await.unwrap();
    let mut hidden = Carousel::new("Hidden", 0);
    hidden.is_active = false;
    carousels.save(&mut hidden).await.unwrap();

    let (status, body) = get(&app, "/api/carousel").await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["title"], "First");
    assert_eq!(listed[1]["title"], "Second");

    let (status, location) = location_of(
        &app,
        &format!("/api/carousel/image/{}", first_id.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location.as_deref(),
        Some("https://blobs.invalid/b/carousels/x.jpg")
    );
}

#[tokio::test]
async fn test_document_listings_respect_gating() {
    let app = test_app();
    let documents = DocumentRepository::new(app.store.as_ref(), app.storage.as_ref());

    let mut manual = Document::new("Manual", false);
    documents.save(&mut manual).await.unwrap();
    let mut prices = Document::new("Price list", true);
    documents.save(&mut prices).await.unwrap();

    let (status, body) = get(&app, "/api/documents/public").await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Manual");
    assert!(listed[0].get("file_url").is_none());

    let (status, _) = get(&app, "/api/documents/private").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    seed_user(&app, "alice", "correct horse").await;
    let (_, body) = post_json(
        &app,
        "/api/auth/login",
        &json!({ "username": "alice", "password": "correct horse" }),
    )
    .await;
    let token = body["access_token"].as_str().unwrap().to_owned();

    let (status, body) = get_with_bearer(&app, "/api/documents/private", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Price list");
}

#[tokio::test]
async fn test_combined_listing_widens_with_bearer() {
    let app = test_app();
    let documents = DocumentRepository::new(app.store.as_ref(), app.storage.as_ref());

    let mut manual = Document::new("Manual", false);
    documents.save(&mut manual).await.unwrap();
    let mut prices = Document::new("Price list", true);
    documents.save(&mut prices).await.unwrap();

    // Anonymous callers see only the public document.
    let (status, body) = get(&app, "/api/documents").await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Manual");

    // A garbage token never rejects; it just stays anonymous.
    let (status, body) = get_with_bearer(&app, "/api/documents", "garbage").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    seed_user(&app, "alice", "correct horse").await;
    let (_, login) = post_json(
        &app,
        "/api/auth/login",
        &json!({ "username": "alice", "password": "correct horse" }),
    )
    .await;
    let token = login["access_token"].as_str().unwrap().to_owned();

    let (status, body) = get_with_bearer(&app, "/api/documents", &token).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Manual", "Price list"]);
}

#[tokio::test]
async fn test_download_public_absolute_url_is_verbatim() {
    let app = test_app();
    let documents = DocumentRepository::new(app.store.as_ref(), app.storage.as_ref());

    let mut doc = Document::new("Catalog", false);
    doc.file_url = Some("https://example.com/catalog.pdf?v=2".to_owned());
    let id = documents.save(&mut doc).await.unwrap();

    let (status, location) =
        location_of(&app, &format!("/api/documents/download/{}", id.as_str()), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("https://example.com/catalog.pdf?v=2"));
}

#[tokio::test]
async fn test_download_gated_document() {
    let app = test_app();
    let documents = DocumentRepository::new(app.store.as_ref(), app.storage.as_ref());

    let mut doc = Document::new("Price list", true);
    doc.file_url = Some("documents/prices.pdf".to_owned());
    let id = documents.save(&mut doc).await.unwrap();
    let uri = format!("/api/documents/download/{}", id.as_str());

    // No credential: 401 with a JSON error body.
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    // Bearer header grants a 15-minute signed URL.
    seed_user(&app, "alice", "correct horse").await;
    let (_, login) = post_json(
        &app,
        "/api/auth/login",
        &json!({ "username": "alice", "password": "correct horse" }),
    )
    .await;
    let token = login["access_token"].as_str().unwrap().to_owned();

    let (status, location) = location_of(&app, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert!(location.unwrap().contains("expires=900"));

    // The token query parameter works without any header.
    let (status, location) = location_of(&app, &format!("{uri}?token={token}"), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert!(location.unwrap().contains("expires=900"));
}

#[tokio::test]
async fn test_download_missing_document_is_404() {
    let app = test_app();

    let (status, _) = get(&app, "/api/documents/download/no-such-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cascade_delete_clears_products_and_blobs() {
    let app = test_app();
    let (main_id, _, product_id, _) = seed_catalog(&app).await;
    assert_eq!(app.storage.len(), 1);

    let categories = CategoryRepository::new(app.store.as_ref(), app.storage.as_ref());
    categories
        .delete_main(&meridian_core::MainCategoryId::new(main_id))
        .await
        .unwrap();

    let (status, _) = get(&app, &format!("/api/products/{product_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.storage.is_empty());

    let (_, body) = get(&app, "/api/categories").await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}
