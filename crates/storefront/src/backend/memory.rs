//! In-memory backend for tests.
//!
//! Enforces the same unique constraints as the hosted tables and can be
//! switched offline to exercise remote-failure paths.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tiendita_core::{
    CartItem, CartItemId, NewCartItem, NewProduct, PasswordDigest, Product, ProductCode,
    ProductId, Role, UserId, Username,
};

use super::{BackendError, CartTable, ImageBucket, ProductTable, UNIQUE_VIOLATION, UserTable};
use crate::models::{NewUser, User};

const PUBLIC_BASE: &str = "https://backend.test/storage/v1/object/public/product-images";

/// Backend whose tables live in process memory.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: Mutex<Vec<(User, PasswordDigest)>>,
    products: Mutex<Vec<Product>>,
    cart: Mutex<Vec<CartItem>>,
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    offline: AtomicBool,
    unreadable: std::sync::Mutex<Vec<ProductCode>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Make product lookups by `code` fail while other calls succeed.
    pub fn fail_product_lookup(&self, code: ProductCode) {
        if let Ok(mut codes) = self.inner.unreadable.lock() {
            codes.push(code);
        }
    }

    fn check_readable(&self, code: &ProductCode) -> Result<(), BackendError> {
        let unreadable = self
            .inner
            .unreadable
            .lock()
            .is_ok_and(|codes| codes.contains(code));
        if unreadable {
            return Err(BackendError::Api {
                status: 500,
                code: None,
                message: format!("product {code} unreadable"),
            });
        }
        Ok(())
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 503,
                code: None,
                message: "backend offline".to_string(),
            });
        }
        Ok(())
    }

    /// Insert a user row directly, bypassing registration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UniqueViolation`] if the username exists.
    pub async fn seed_user(
        &self,
        username: Username,
        digest: PasswordDigest,
        role: Role,
    ) -> Result<User, BackendError> {
        self.insert_user(&NewUser {
            username,
            password_digest: digest,
            role,
        })
        .await
    }

    /// Insert a product row directly.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UniqueViolation`] if the code exists.
    pub async fn seed_product(&self, product: NewProduct) -> Result<Product, BackendError> {
        self.insert_product(&product).await
    }

    /// Snapshot of the `users` table.
    pub async fn users(&self) -> Vec<User> {
        self.inner
            .users
            .lock()
            .await
            .iter()
            .map(|(user, _)| user.clone())
            .collect()
    }

    /// Stored digest for a username.
    pub async fn digest_of(&self, username: &Username) -> Option<PasswordDigest> {
        self.inner
            .users
            .lock()
            .await
            .iter()
            .find(|(user, _)| &user.username == username)
            .map(|(_, digest)| digest.clone())
    }

    /// Snapshot of the `products` table.
    pub async fn products(&self) -> Vec<Product> {
        self.inner.products.lock().await.clone()
    }

    /// Snapshot of the `cart` table.
    pub async fn cart(&self) -> Vec<CartItem> {
        self.inner.cart.lock().await.clone()
    }

    /// Content type and size of an uploaded object.
    pub async fn object(&self, path: &str) -> Option<(String, usize)> {
        self.inner
            .objects
            .lock()
            .await
            .get(path)
            .map(|(content_type, bytes)| (content_type.clone(), bytes.len()))
    }
}

fn unique_violation(what: &str) -> BackendError {
    BackendError::UniqueViolation(format!(
        "{UNIQUE_VIOLATION}: duplicate key value violates unique constraint on {what}"
    ))
}

#[async_trait]
impl UserTable for MemoryBackend {
    async fn find_by_credentials(
        &self,
        username: &Username,
        digest: &PasswordDigest,
    ) -> Result<User, BackendError> {
        self.check_online()?;
        let users = self.inner.users.lock().await;
        let mut matches = users
            .iter()
            .filter(|(user, stored)| &user.username == username && stored == digest);

        match (matches.next(), matches.next()) {
            (Some((user, _)), None) => Ok(user.clone()),
            _ => Err(BackendError::NotSingleRow),
        }
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, BackendError> {
        self.check_online()?;
        let mut users = self.inner.users.lock().await;
        if users.iter().any(|(u, _)| u.username == user.username) {
            return Err(unique_violation("users.username"));
        }

        let row = User {
            id: UserId::generate(),
            username: user.username.clone(),
            role: user.role,
        };
        users.push((row.clone(), user.password_digest.clone()));
        Ok(row)
    }
}

#[async_trait]
impl ProductTable for MemoryBackend {
    async fn list_products(&self, limit: Option<usize>) -> Result<Vec<Product>, BackendError> {
        self.check_online()?;
        let mut products = self.inner.products.lock().await.clone();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = limit {
            products.truncate(limit);
        }
        Ok(products)
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        self.check_online()?;
        let products = self.inner.products.lock().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn product_by_code(&self, code: &ProductCode) -> Result<Option<Product>, BackendError> {
        self.check_online()?;
        self.check_readable(code)?;
        let products = self.inner.products.lock().await;
        Ok(products.iter().find(|p| &p.code == code).cloned())
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError> {
        self.check_online()?;
        let mut products = self.inner.products.lock().await;
        if products.iter().any(|p| p.code == product.code) {
            return Err(unique_violation("products.code"));
        }

        let row = product.clone().into_product(ProductId::generate());
        products.push(row.clone());
        Ok(row)
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Option<Product>, BackendError> {
        self.check_online()?;
        let mut products = self.inner.products.lock().await;
        if products.iter().any(|p| p.code == product.code && p.id != id) {
            return Err(unique_violation("products.code"));
        }

        let Some(existing) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        let image_url = product.image_url.clone().or_else(|| existing.image_url.take());
        *existing = NewProduct {
            image_url,
            ..product.clone()
        }
        .into_product(id);
        Ok(Some(existing.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), BackendError> {
        self.check_online()?;
        self.inner.products.lock().await.retain(|p| p.id != id);
        Ok(())
    }
}

#[async_trait]
impl CartTable for MemoryBackend {
    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>, BackendError> {
        self.check_online()?;
        let cart = self.inner.cart.lock().await;
        let mut rows: Vec<CartItem> = cart.iter().filter(|i| i.user_id == user).cloned().collect();
        rows.sort_by(|a, b| a.product_code.as_str().cmp(b.product_code.as_str()));
        Ok(rows)
    }

    async fn cart_item_for_product(
        &self,
        user: UserId,
        code: &ProductCode,
    ) -> Result<Option<CartItem>, BackendError> {
        self.check_online()?;
        let cart = self.inner.cart.lock().await;
        Ok(cart
            .iter()
            .find(|i| i.user_id == user && &i.product_code == code)
            .cloned())
    }

    async fn cart_item(
        &self,
        user: UserId,
        id: CartItemId,
    ) -> Result<Option<CartItem>, BackendError> {
        self.check_online()?;
        let cart = self.inner.cart.lock().await;
        Ok(cart.iter().find(|i| i.user_id == user && i.id == id).cloned())
    }

    async fn insert_cart_item(&self, item: &NewCartItem) -> Result<CartItem, BackendError> {
        self.check_online()?;
        let row = CartItem {
            id: CartItemId::generate(),
            user_id: item.user_id,
            product_code: item.product_code.clone(),
            count: item.count,
        };
        self.inner.cart.lock().await.push(row.clone());
        Ok(row)
    }

    async fn set_cart_count(
        &self,
        user: UserId,
        id: CartItemId,
        count: u32,
    ) -> Result<(), BackendError> {
        self.check_online()?;
        let mut cart = self.inner.cart.lock().await;
        if let Some(row) = cart.iter_mut().find(|i| i.user_id == user && i.id == id) {
            row.count = count;
        }
        Ok(())
    }

    async fn delete_cart_item(&self, user: UserId, id: CartItemId) -> Result<(), BackendError> {
        self.check_online()?;
        self.inner
            .cart
            .lock()
            .await
            .retain(|i| !(i.user_id == user && i.id == id));
        Ok(())
    }
}

#[async_trait]
impl ImageBucket for MemoryBackend {
    async fn upload_image(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        self.check_online()?;
        self.inner
            .objects
            .lock()
            .await
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(format!("{PUBLIC_BASE}/{path}"))
    }
}
