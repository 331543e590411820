//! Meridian Catalog API server.
//!
//! Serves the catalog JSON API. Backend selection is config-driven: with a
//! GCP project configured the store is Firestore and blobs live in Cloud
//! Storage, both sharing one service-account token provider; without one,
//! in-memory backends serve local development.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use meridian_api::config::AppConfig;
use meridian_api::gcp::{GcpTokenProvider, SCOPES};
use meridian_api::routes;
use meridian_api::state::AppState;
use meridian_api::storage::{ObjectStorage, gcs::GcsStorage, memory::MemoryStorage};
use meridian_api::store::{DocumentStore, firestore::FirestoreStore, memory::MemoryStore};

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sentry guard must outlive the server or buffered events are dropped.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

fn init_tracing() {
    // RUST_LOG wins; otherwise log our crate at info and tower-http at debug.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "meridian_api=info,tower_http=debug".into());

    let to_sentry = |metadata: &tracing::Metadata<'_>| match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(to_sentry))
        .init();
}

/// Build the store and storage backends the configuration asks for.
fn build_backends(config: &AppConfig) -> (Arc<dyn DocumentStore>, Arc<dyn ObjectStorage>) {
    match &config.gcp {
        Some(gcp) => {
            let tokens = Arc::new(
                GcpTokenProvider::from_file(&gcp.credentials_path, SCOPES)
                    .expect("Failed to load GCP service account key"),
            );
            tracing::info!(
                project = %gcp.project_id,
                bucket = %gcp.bucket,
                "Using Firestore and Cloud Storage backends"
            );
            (
                Arc::new(FirestoreStore::new(gcp.project_id.clone(), tokens.clone())),
                Arc::new(GcsStorage::new(gcp.bucket.clone(), tokens)),
            )
        }
        None => {
            tracing::warn!("No GCP configuration; using in-memory backends (data is not persisted)");
            (Arc::new(MemoryStore::new()), Arc::new(MemoryStorage::new()))
        }
    }
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Sentry before the tracing registry so its layer has a live hub.
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let (store, storage) = build_backends(&config);
    let addr = config.socket_addr();
    let state = AppState::new(config, store, storage);

    // Sentry layers wrap the whole router for full request coverage.
    let app = routes::app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("catalog API listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
