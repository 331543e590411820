//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::TokenService;
use crate::storage::ObjectStorage;
use crate::store::DocumentStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configured store, storage, and token service. Built once in `main`;
/// handlers receive it through axum's `State` extractor, so every dependency
/// is explicit.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    tokens: TokenService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                storage,
                tokens,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the object storage.
    #[must_use]
    pub fn storage(&self) -> &dyn ObjectStorage {
        self.inner.storage.as_ref()
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }
}
