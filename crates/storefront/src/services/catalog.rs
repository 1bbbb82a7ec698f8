//! Product catalog reads.
//!
//! Listings are cached with `moka`; the cache is invalidated only after a
//! product write has been confirmed by the backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use tiendita_core::{Product, ProductFilter};

use crate::backend::{BackendError, ProductTable};

/// Number of products shown in the carousel.
pub const FEATURED_LIMIT: usize = 9;

/// Errors that can occur when reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to load products: {0}")]
    Backend(#[from] BackendError),
}

/// Cache key for product listings.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    All,
    Featured,
}

/// Shared listing cache.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, Arc<Vec<Product>>>,
}

impl CatalogCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(8).time_to_live(ttl).build(),
        }
    }

    /// Drop every cached listing.
    pub fn invalidate(&self) {
        debug!("Invalidating catalog cache");
        self.cache.invalidate_all();
    }
}

/// Catalog reads over the product table.
pub struct CatalogService<'a, P: ProductTable + ?Sized> {
    products: &'a P,
    cache: &'a CatalogCache,
}

impl<'a, P: ProductTable + ?Sized> CatalogService<'a, P> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(products: &'a P, cache: &'a CatalogCache) -> Self {
        Self { products, cache }
    }

    /// All products ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Backend` if the listing cannot be fetched.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        self.cached(CacheKey::All, None).await
    }

    /// The first [`FEATURED_LIMIT`] products by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Backend` if the listing cannot be fetched.
    #[instrument(skip(self))]
    pub async fn featured(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        self.cached(CacheKey::Featured, Some(FEATURED_LIMIT)).await
    }

    /// Products matching a filter, in name order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Backend` if the listing cannot be fetched.
    pub async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let products = self.list().await?;
        Ok(filter.apply(&products))
    }

    async fn cached(
        &self,
        key: CacheKey,
        limit: Option<usize>,
    ) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(products) = self.cache.cache.get(&key).await {
            return Ok(products);
        }

        let products = Arc::new(self.products.list_products(limit).await?);
        self.cache.cache.insert(key, Arc::clone(&products)).await;
        Ok(products)
    }
}
