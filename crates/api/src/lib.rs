//! Meridian Catalog API.
//!
//! Backend for a product catalog: categories, products and their images,
//! carousel banners, and gated document downloads, served as a JSON HTTP API
//! over a schemaless document store and an object store.
//!
//! # Architecture
//!
//! - [`store`] - document store gateway (in-memory or Firestore)
//! - [`storage`] - object storage boundary (in-memory or Cloud Storage)
//! - [`gcp`] - service-account token provider shared by the GCP backends
//! - [`models`] - typed entities and repositories, cascading deletes
//! - [`services`] - authentication, tokens, and the download resolver
//! - [`routes`] - axum handlers; [`middleware`] - bearer extractors
//!
//! The binary in `main.rs` wires configuration to one concrete backend pair
//! and serves [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gcp;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod store;
