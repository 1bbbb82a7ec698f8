//! Shopping cart operations.
//!
//! Rows live in the remote `cart` table, one per (user, product code). Every
//! change is confirmed by the backend before the caller re-renders.

use thiserror::Error;
use tracing::{info, instrument, warn};

use tiendita_core::{CartItem, CartItemId, NewCartItem, Price, Product, ProductCode, UserId};

use crate::backend::{BackendError, CartTable, ProductTable};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("product not found")]
    ProductNotFound,

    #[error("this product is out of stock")]
    OutOfStock,

    #[error("only {available} units available")]
    StockExceeded { available: u32 },

    #[error("cart item not found")]
    ItemNotFound,

    #[error("cart operation failed: {0}")]
    Backend(#[from] BackendError),
}

/// A cart row with its product, when the product still exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Option<Product>,
}

impl CartLine {
    /// `price * count`, or `None` without a product.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        self.product.as_ref().map(|p| p.price.times(self.item.count))
    }

    /// Whether another unit can be added.
    #[must_use]
    pub fn can_increment(&self) -> bool {
        self.product
            .as_ref()
            .is_some_and(|p| self.item.count < p.stock)
    }
}

/// Result of a quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Updated(u32),
    Removed,
}

/// Sum of line subtotals; lines without a product count as zero.
#[must_use]
pub fn total(lines: &[CartLine]) -> Price {
    lines.iter().filter_map(CartLine::subtotal).sum()
}

/// Cart operations for one user at a time.
pub struct CartService<'a, B: CartTable + ProductTable + ?Sized> {
    backend: &'a B,
}

impl<'a, B: CartTable + ProductTable + ?Sized> CartService<'a, B> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// The user's cart rows, each with its product.
    ///
    /// A row whose product cannot be read is kept with `product: None`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if rows cannot be loaded.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn lines(&self, user: UserId) -> Result<Vec<CartLine>, CartError> {
        let items = self.backend.cart_items(user).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = match self.backend.product_by_code(&item.product_code).await {
                Ok(product) => product,
                Err(e) => {
                    warn!(error = %e, code = %item.product_code, "Failed to load cart product");
                    None
                }
            };
            lines.push(CartLine { item, product });
        }

        Ok(lines)
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound`, `CartError::OutOfStock`,
    /// `CartError::StockExceeded` when the row is already at stock, or
    /// `CartError::Backend`.
    #[instrument(skip(self), fields(user_id = %user, code = %code))]
    pub async fn add(&self, user: UserId, code: &ProductCode) -> Result<CartItem, CartError> {
        let product = self
            .backend
            .product_by_code(code)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        if !product.is_available() {
            return Err(CartError::OutOfStock);
        }

        if let Some(mut existing) = self.backend.cart_item_for_product(user, code).await? {
            if existing.count >= product.stock {
                return Err(CartError::StockExceeded {
                    available: product.stock,
                });
            }
            let count = existing.count + 1;
            self.backend.set_cart_count(user, existing.id, count).await?;
            existing.count = count;
            info!(count, "Cart row incremented");
            return Ok(existing);
        }

        let item = self
            .backend
            .insert_cart_item(&NewCartItem {
                user_id: user,
                product_code: code.clone(),
                count: 1,
            })
            .await?;
        info!(item_id = %item.id, "Cart row created");
        Ok(item)
    }

    /// Set a row's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the row is not the user's,
    /// `CartError::StockExceeded` above stock, or `CartError::Backend`.
    #[instrument(skip(self), fields(user_id = %user, item_id = %item))]
    pub async fn set_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        quantity: i64,
    ) -> Result<QuantityChange, CartError> {
        let row = self
            .backend
            .cart_item(user, item)
            .await?
            .ok_or(CartError::ItemNotFound)?;

        if quantity <= 0 {
            self.backend.delete_cart_item(user, row.id).await?;
            info!("Cart row removed");
            return Ok(QuantityChange::Removed);
        }
        let count = u32::try_from(quantity).unwrap_or(u32::MAX);

        if let Some(product) = self.backend.product_by_code(&row.product_code).await?
            && count > product.stock
        {
            return Err(CartError::StockExceeded {
                available: product.stock,
            });
        }

        self.backend.set_cart_count(user, row.id, count).await?;
        Ok(QuantityChange::Updated(count))
    }

    /// Delete one of the user's rows.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the row is not the user's, or
    /// `CartError::Backend`.
    #[instrument(skip(self), fields(user_id = %user, item_id = %item))]
    pub async fn remove(&self, user: UserId, item: CartItemId) -> Result<(), CartError> {
        let row = self
            .backend
            .cart_item(user, item)
            .await?
            .ok_or(CartError::ItemNotFound)?;
        self.backend.delete_cart_item(user, row.id).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tiendita_core::NewProduct;

    use super::*;
    use crate::backend::MemoryBackend;

    fn code(s: &str) -> ProductCode {
        ProductCode::parse(s).unwrap()
    }

    async fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        for (name, c, price, stock) in [
            ("Arroz", "ARZ", "12.50", 3),
            ("Frijol", "FRJ", "20", 0),
            ("Miel", "MIE", "99.99", 40),
        ] {
            backend
                .seed_product(NewProduct {
                    name: name.to_string(),
                    price: Price::parse(price).unwrap(),
                    stock,
                    code: code(c),
                    image_url: None,
                })
                .await
                .unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn test_add_inserts_then_increments() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let user = UserId::generate();

        let first = cart.add(user, &code("ARZ")).await.unwrap();
        assert_eq!(first.count, 1);
        let second = cart.add(user, &code("ARZ")).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.count, 2);
        assert_eq!(backend.cart().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_out_of_stock() {
        let backend = backend().await;
        let cart = CartService::new(&backend);

        let err = cart.add(UserId::generate(), &code("FRJ")).await.unwrap_err();
        assert!(matches!(err, CartError::OutOfStock));
        assert!(backend.cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_stops_at_stock() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let user = UserId::generate();

        for _ in 0..3 {
            cart.add(user, &code("ARZ")).await.unwrap();
        }
        let err = cart.add(user, &code("ARZ")).await.unwrap_err();
        assert!(matches!(err, CartError::StockExceeded { available: 3 }));
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let backend = backend().await;
        let cart = CartService::new(&backend);

        let err = cart.add(UserId::generate(), &code("NOPE")).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound));
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let user = UserId::generate();
        let item = cart.add(user, &code("MIE")).await.unwrap();

        assert_eq!(
            cart.set_quantity(user, item.id, 0).await.unwrap(),
            QuantityChange::Removed
        );
        assert!(backend.cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_negative_removes() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let user = UserId::generate();
        let item = cart.add(user, &code("MIE")).await.unwrap();

        assert_eq!(
            cart.set_quantity(user, item.id, -1).await.unwrap(),
            QuantityChange::Removed
        );
    }

    #[tokio::test]
    async fn test_set_quantity_respects_stock() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let user = UserId::generate();
        let item = cart.add(user, &code("ARZ")).await.unwrap();

        let err = cart.set_quantity(user, item.id, 4).await.unwrap_err();
        assert!(matches!(err, CartError::StockExceeded { available: 3 }));
        assert_eq!(
            cart.set_quantity(user, item.id, 3).await.unwrap(),
            QuantityChange::Updated(3)
        );
        assert_eq!(backend.cart().await[0].count, 3);
    }

    #[tokio::test]
    async fn test_other_users_rows_untouched() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let owner = UserId::generate();
        let intruder = UserId::generate();
        let item = cart.add(owner, &code("MIE")).await.unwrap();

        let err = cart.set_quantity(intruder, item.id, 0).await.unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound));
        let err = cart.remove(intruder, item.id).await.unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound));
        assert_eq!(backend.cart().await.len(), 1);
    }

    #[tokio::test]
    async fn test_lines_and_total() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let user = UserId::generate();
        cart.add(user, &code("ARZ")).await.unwrap();
        cart.add(user, &code("ARZ")).await.unwrap();
        cart.add(user, &code("MIE")).await.unwrap();

        let lines = cart.lines(user).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(total(&lines), Price::parse("124.99").unwrap());
    }

    #[tokio::test]
    async fn test_line_without_product_excluded_from_total() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let user = UserId::generate();
        cart.add(user, &code("MIE")).await.unwrap();
        let miel = backend
            .products()
            .await
            .into_iter()
            .find(|p| p.code == code("MIE"))
            .unwrap();
        backend.delete_product(miel.id).await.unwrap();

        let lines = cart.lines(user).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].product.is_none());
        assert!(!lines[0].can_increment());
        assert_eq!(total(&lines), Price::ZERO);
    }

    #[tokio::test]
    async fn test_unreadable_product_keeps_rest_of_cart() {
        let backend = backend().await;
        let cart = CartService::new(&backend);
        let user = UserId::generate();
        cart.add(user, &code("ARZ")).await.unwrap();
        cart.add(user, &code("MIE")).await.unwrap();
        backend.fail_product_lookup(code("MIE"));

        let lines = cart.lines(user).await.unwrap();
        assert_eq!(lines.len(), 2);
        let arroz = lines.iter().find(|l| l.item.product_code == code("ARZ")).unwrap();
        let miel = lines.iter().find(|l| l.item.product_code == code("MIE")).unwrap();
        assert!(arroz.product.is_some());
        assert!(miel.product.is_none());
        assert_eq!(total(&lines), Price::parse("12.50").unwrap());
    }

    #[tokio::test]
    async fn test_total_of_empty_cart() {
        assert_eq!(total(&[]), Price::ZERO);
    }
}
