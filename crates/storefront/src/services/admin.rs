//! Product management for the admin panel.
//!
//! Form input is validated locally; only a well-formed [`NewProduct`] ever
//! reaches the backend. The catalog cache is invalidated after each
//! confirmed write.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use tiendita_core::{NewProduct, Price, Product, ProductCode, ProductId};

use crate::backend::{BackendError, ImageBucket, ProductTable};
use crate::services::catalog::CatalogCache;

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Local validation failures of the product form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProductFormError {
    #[error("Name is required")]
    MissingName,
    #[error("Price must be a number greater than or equal to 0")]
    InvalidPrice,
    #[error("Stock must be a whole number greater than or equal to 0")]
    InvalidStock,
    #[error("Code is required")]
    MissingCode,
}

/// Errors that can occur during product management.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Form(#[from] ProductFormError),

    #[error("A product with this code already exists")]
    DuplicateCode,

    #[error("Product not found")]
    NotFound,

    #[error("Invalid image: {0}")]
    InvalidImage(&'static str),

    #[error("Backend error: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for AdminError {
    fn from(e: BackendError) -> Self {
        if e.is_unique_violation() {
            Self::DuplicateCode
        } else {
            Self::Backend(e)
        }
    }
}

/// Raw product form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub code: String,
}

impl ProductForm {
    /// Prefill the form from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price.amount().to_string(),
            stock: product.stock.to_string(),
            code: product.code.to_string(),
        }
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field, in form order.
    pub fn validate(&self) -> Result<NewProduct, ProductFormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProductFormError::MissingName);
        }
        let price = Price::parse(&self.price).map_err(|_| ProductFormError::InvalidPrice)?;
        let stock = self
            .stock
            .trim()
            .parse::<u32>()
            .map_err(|_| ProductFormError::InvalidStock)?;
        let code = ProductCode::parse(&self.code).map_err(|_| ProductFormError::MissingCode)?;

        Ok(NewProduct {
            name: name.to_string(),
            price,
            stock,
            code,
            image_url: None,
        })
    }
}

/// An uploaded product image.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// File extension for an accepted image type.
    fn extension(&self) -> Result<&'static str, AdminError> {
        match self.content_type.as_str() {
            "image/png" => Ok("png"),
            "image/jpeg" | "image/jpg" => Ok("jpg"),
            "image/webp" => Ok("webp"),
            "image/gif" => Ok("gif"),
            _ => Err(AdminError::InvalidImage("use a PNG, JPEG, WebP or GIF file")),
        }
    }

    fn check(&self) -> Result<&'static str, AdminError> {
        if self.bytes.is_empty() {
            return Err(AdminError::InvalidImage("the file is empty"));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AdminError::InvalidImage("the file is larger than 5 MB"));
        }
        self.extension()
    }
}

/// Product writes for administrators.
pub struct AdminService<'a, B: ProductTable + ImageBucket + ?Sized> {
    backend: &'a B,
    cache: &'a CatalogCache,
}

impl<'a, B: ProductTable + ImageBucket + ?Sized> AdminService<'a, B> {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(backend: &'a B, cache: &'a CatalogCache) -> Self {
        Self { backend, cache }
    }

    /// All products ordered by name, read fresh from the backend.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Backend` if the listing cannot be fetched.
    pub async fn products(&self) -> Result<Vec<Product>, AdminError> {
        Ok(self.backend.list_products(None).await?)
    }

    /// Look up one product.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` or `AdminError::Backend`.
    pub async fn product(&self, id: ProductId) -> Result<Product, AdminError> {
        self.backend
            .product_by_id(id)
            .await?
            .ok_or(AdminError::NotFound)
    }

    /// Create a product, uploading its image first when one is given.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidImage` before any remote call,
    /// `AdminError::DuplicateCode` on a code conflict, or `AdminError::Backend`.
    #[instrument(skip(self, product, image), fields(code = %product.code))]
    pub async fn create(
        &self,
        mut product: NewProduct,
        image: Option<ImageUpload>,
    ) -> Result<Product, AdminError> {
        if let Some(image) = image {
            product.image_url = Some(self.upload(image).await?);
        }

        let created = self.backend.insert_product(&product).await?;
        self.cache.invalidate();
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// Replace a product's fields; the image is kept unless a new one is given.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`], plus `AdminError::NotFound`.
    #[instrument(skip(self, product, image), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: ProductId,
        mut product: NewProduct,
        image: Option<ImageUpload>,
    ) -> Result<Product, AdminError> {
        if let Some(image) = image {
            product.image_url = Some(self.upload(image).await?);
        }

        let updated = self
            .backend
            .update_product(id, &product)
            .await?
            .ok_or(AdminError::NotFound)?;
        self.cache.invalidate();
        info!("Product updated");
        Ok(updated)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Backend` if the delete fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<(), AdminError> {
        self.backend.delete_product(id).await?;
        self.cache.invalidate();
        info!("Product deleted");
        Ok(())
    }

    async fn upload(&self, image: ImageUpload) -> Result<String, AdminError> {
        let extension = image.check()?;
        let path = format!("products/{}.{extension}", uuid::Uuid::new_v4());
        Ok(self
            .backend
            .upload_image(&path, &image.content_type, image.bytes)
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::services::catalog::CatalogService;

    fn form(name: &str, price: &str, stock: &str, code: &str) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            price: price.to_string(),
            stock: stock.to_string(),
            code: code.to_string(),
        }
    }

    fn png() -> ImageUpload {
        ImageUpload {
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_form_validation_order() {
        assert_eq!(
            form("", "x", "x", "").validate(),
            Err(ProductFormError::MissingName)
        );
        assert_eq!(
            form("Miel", "abc", "1", "M1").validate(),
            Err(ProductFormError::InvalidPrice)
        );
        assert_eq!(
            form("Miel", "-1", "1", "M1").validate(),
            Err(ProductFormError::InvalidPrice)
        );
        assert_eq!(
            form("Miel", "10", "1.5", "M1").validate(),
            Err(ProductFormError::InvalidStock)
        );
        assert_eq!(
            form("Miel", "10", "-2", "M1").validate(),
            Err(ProductFormError::InvalidStock)
        );
        assert_eq!(
            form("Miel", "10", "2", "  ").validate(),
            Err(ProductFormError::MissingCode)
        );
    }

    #[test]
    fn test_form_valid() {
        let product = form(" Miel ", "99.90", "12", " M1 ").validate().unwrap();
        assert_eq!(product.name, "Miel");
        assert_eq!(product.price, Price::parse("99.9").unwrap());
        assert_eq!(product.stock, 12);
        assert_eq!(product.code.as_str(), "M1");
    }

    #[test]
    fn test_image_checks() {
        assert!(png().check().is_ok());

        let svg = ImageUpload {
            content_type: "image/svg+xml".to_string(),
            bytes: vec![1],
        };
        assert!(matches!(svg.check(), Err(AdminError::InvalidImage(_))));

        let empty = ImageUpload {
            content_type: "image/png".to_string(),
            bytes: Vec::new(),
        };
        assert!(matches!(empty.check(), Err(AdminError::InvalidImage(_))));

        let huge = ImageUpload {
            content_type: "image/jpeg".to_string(),
            bytes: vec![0; MAX_IMAGE_BYTES + 1],
        };
        assert!(matches!(huge.check(), Err(AdminError::InvalidImage(_))));
    }

    #[tokio::test]
    async fn test_create_with_image_and_invalidate() {
        let backend = MemoryBackend::new();
        let cache = CatalogCache::new(Duration::from_secs(60));
        let catalog = CatalogService::new(&backend, &cache);
        assert!(catalog.list().await.unwrap().is_empty());

        let admin = AdminService::new(&backend, &cache);
        let product = form("Miel", "99.90", "12", "M1").validate().unwrap();
        let created = admin.create(product, Some(png())).await.unwrap();

        let url = created.image_url.clone().unwrap();
        let path = url.rsplit("product-images/").next().unwrap();
        assert_eq!(backend.object(path).await, Some(("image/png".to_string(), 4)));
        assert_eq!(catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let backend = MemoryBackend::new();
        let cache = CatalogCache::new(Duration::from_secs(60));
        let admin = AdminService::new(&backend, &cache);

        let product = form("Miel", "99.90", "12", "M1").validate().unwrap();
        admin.create(product.clone(), None).await.unwrap();
        let err = admin.create(product, None).await.unwrap_err();
        assert!(matches!(err, AdminError::DuplicateCode));
    }

    #[tokio::test]
    async fn test_update_keeps_image() {
        let backend = MemoryBackend::new();
        let cache = CatalogCache::new(Duration::from_secs(60));
        let admin = AdminService::new(&backend, &cache);

        let product = form("Miel", "99.90", "12", "M1").validate().unwrap();
        let created = admin.create(product, Some(png())).await.unwrap();

        let changed = form("Miel de agave", "80", "3", "M1").validate().unwrap();
        let updated = admin.update(created.id, changed, None).await.unwrap();
        assert_eq!(updated.name, "Miel de agave");
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.image_url, created.image_url);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let backend = MemoryBackend::new();
        let cache = CatalogCache::new(Duration::from_secs(60));
        let admin = AdminService::new(&backend, &cache);

        let product = form("Miel", "1", "1", "M1").validate().unwrap();
        let err = admin.update(ProductId::generate(), product, None).await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound));
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MemoryBackend::new();
        let cache = CatalogCache::new(Duration::from_secs(60));
        let admin = AdminService::new(&backend, &cache);

        let product = form("Miel", "1", "1", "M1").validate().unwrap();
        let created = admin.create(product, None).await.unwrap();
        admin.delete(created.id).await.unwrap();
        assert!(admin.products().await.unwrap().is_empty());
        assert!(matches!(
            admin.product(created.id).await.unwrap_err(),
            AdminError::NotFound
        ));
    }
}
