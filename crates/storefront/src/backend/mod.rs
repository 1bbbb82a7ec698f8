//! Hosted backend access.
//!
//! # Architecture
//!
//! - The backend (PostgREST tables + a storage bucket) is the source of truth;
//!   nothing is synced locally
//! - Row access goes through the table traits below so services can run
//!   against [`BackendClient`] in production and [`MemoryBackend`] in tests
//! - No retries: a failed call is reported once and the caller decides
//!
//! # Tables
//!
//! - `users`: `id, username (unique), password (digest), role`
//! - `products`: `id, name, price, stock, code (unique), image_url`
//! - `cart`: `id, user_id, product_code, count`

mod client;
#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use client::BackendClient;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryBackend;

use async_trait::async_trait;
use thiserror::Error;

use tiendita_core::{
    CartItem, CartItemId, NewCartItem, NewProduct, PasswordDigest, Product, ProductCode,
    ProductId, UserId, Username,
};

use crate::models::{NewUser, User};

/// Postgres error code for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error body.
    #[error("Backend error {status} ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Insert or update hit a unique constraint.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A single-row read matched zero or several rows.
    #[error("Expected exactly one row")]
    NotSingleRow,

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl BackendError {
    /// Whether the error is a unique constraint violation.
    #[must_use]
    pub const fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }
}

/// The `users` table.
#[async_trait]
pub trait UserTable: Send + Sync {
    /// Exact match on `(username, password)` requesting a single row.
    ///
    /// Zero or several matches yield [`BackendError::NotSingleRow`].
    async fn find_by_credentials(
        &self,
        username: &Username,
        digest: &PasswordDigest,
    ) -> Result<User, BackendError>;

    /// Insert a user and return the stored row.
    async fn insert_user(&self, user: &NewUser) -> Result<User, BackendError>;
}

/// The `products` table.
#[async_trait]
pub trait ProductTable: Send + Sync {
    /// Products ordered by name, optionally limited.
    async fn list_products(&self, limit: Option<usize>) -> Result<Vec<Product>, BackendError>;

    /// Look up a product by id.
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, BackendError>;

    /// Look up a product by its code.
    async fn product_by_code(&self, code: &ProductCode) -> Result<Option<Product>, BackendError>;

    /// Insert a product and return the stored row.
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError>;

    /// Replace a product's fields and return the stored row.
    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Option<Product>, BackendError>;

    /// Delete a product by id.
    async fn delete_product(&self, id: ProductId) -> Result<(), BackendError>;
}

/// The `cart` table.
///
/// Every call is scoped to `user` so rows of other users are never touched.
#[async_trait]
pub trait CartTable: Send + Sync {
    /// All cart rows of a user.
    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>, BackendError>;

    /// The user's row for a product, if any.
    async fn cart_item_for_product(
        &self,
        user: UserId,
        code: &ProductCode,
    ) -> Result<Option<CartItem>, BackendError>;

    /// The user's row with the given id, if any.
    async fn cart_item(&self, user: UserId, id: CartItemId)
    -> Result<Option<CartItem>, BackendError>;

    /// Insert a cart row and return it.
    async fn insert_cart_item(&self, item: &NewCartItem) -> Result<CartItem, BackendError>;

    /// Set the count of one of the user's rows.
    async fn set_cart_count(
        &self,
        user: UserId,
        id: CartItemId,
        count: u32,
    ) -> Result<(), BackendError>;

    /// Delete one of the user's rows.
    async fn delete_cart_item(&self, user: UserId, id: CartItemId) -> Result<(), BackendError>;
}

/// The product image bucket.
#[async_trait]
pub trait ImageBucket: Send + Sync {
    /// Upload (or overwrite) an object and return its public URL.
    async fn upload_image(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError>;
}

/// Everything the storefront needs from the backend.
pub trait Backend: UserTable + ProductTable + CartTable + ImageBucket {}

impl<T> Backend for T where T: UserTable + ProductTable + CartTable + ImageBucket {}
