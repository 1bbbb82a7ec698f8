//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{Backend, BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::services::{CatalogCache, InFlight};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend, the catalog cache and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: Arc<dyn Backend>,
    catalog: CatalogCache,
    inflight: InFlight,
}

impl AppState {
    /// Create application state talking to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Create application state over any backend implementation.
    #[must_use]
    pub fn with_backend(config: StorefrontConfig, backend: Arc<dyn Backend>) -> Self {
        let catalog = CatalogCache::new(config.catalog_cache_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                catalog,
                inflight: InFlight::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.inner.backend.as_ref()
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Get a reference to the in-flight submission registry.
    #[must_use]
    pub fn inflight(&self) -> &InFlight {
        &self.inner.inflight
    }
}
