//! Catalog product types.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Stock level at or above which a product is considered well stocked.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Errors that can occur when parsing a [`ProductCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductCodeError {
    /// The input is empty or only whitespace.
    #[error("product code cannot be empty")]
    Empty,
}

/// Merchant-assigned product code, unique in the remote product table.
///
/// Cart rows reference products by this code rather than by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(String);

impl ProductCode {
    /// Parse a product code, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ProductCodeError::Empty`] if nothing is left after trimming.
    pub fn parse(s: &str) -> Result<Self, ProductCodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ProductCodeError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row of the remote `products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub code: ProductCode,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Availability bucket used for badges.
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel::from_stock(self.stock)
    }

    /// Whether at least one unit can be added to a cart.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.stock > 0
    }
}

/// Payload for inserting or updating a product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub code: ProductCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NewProduct {
    /// Build the row a successful insert would produce.
    #[must_use]
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            stock: self.stock,
            code: self.code,
            image_url: self.image_url,
        }
    }
}

/// Availability bucket shown next to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockLevel {
    OutOfStock,
    Low,
    InStock,
}

impl StockLevel {
    /// Classify a stock count: `0` is out of stock, below
    /// [`LOW_STOCK_THRESHOLD`] is low.
    #[must_use]
    pub const fn from_stock(stock: u32) -> Self {
        if stock == 0 {
            Self::OutOfStock
        } else if stock < LOW_STOCK_THRESHOLD {
            Self::Low
        } else {
            Self::InStock
        }
    }

    /// Badge label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OutOfStock => "Out of stock",
            Self::Low => "Low stock",
            Self::InStock => "In stock",
        }
    }

    /// Badge style class.
    #[must_use]
    pub const fn severity(self) -> &'static str {
        match self {
            Self::OutOfStock => "danger",
            Self::Low => "warning",
            Self::InStock => "success",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_level_boundaries() {
        assert_eq!(StockLevel::from_stock(0), StockLevel::OutOfStock);
        assert_eq!(StockLevel::from_stock(1), StockLevel::Low);
        assert_eq!(StockLevel::from_stock(9), StockLevel::Low);
        assert_eq!(StockLevel::from_stock(10), StockLevel::InStock);
    }

    #[test]
    fn test_product_code_trims() {
        assert_eq!(ProductCode::parse(" P-01 ").expect("valid").as_str(), "P-01");
        assert_eq!(ProductCode::parse("  "), Err(ProductCodeError::Empty));
    }

    #[test]
    fn test_product_deserializes_remote_row() {
        let row = r#"{
            "id": "6f1c2b38-0f7e-4d59-9a43-0c8f5f7a9d11",
            "name": "Mate",
            "price": 12.5,
            "stock": 3,
            "code": "MATE-1",
            "image_url": null
        }"#;
        let product: Product = serde_json::from_str(row).expect("row");
        assert_eq!(product.name, "Mate");
        assert_eq!(product.stock_level(), StockLevel::Low);
        assert!(product.image_url.is_none());
    }

    #[test]
    fn test_product_row_without_image_column() {
        let row = r#"{
            "id": "6f1c2b38-0f7e-4d59-9a43-0c8f5f7a9d11",
            "name": "Yerba",
            "price": "4.00",
            "stock": 0,
            "code": "YER-1"
        }"#;
        let product: Product = serde_json::from_str(row).expect("row");
        assert!(!product.is_available());
    }

    #[test]
    fn test_new_product_skips_missing_image() {
        let draft = NewProduct {
            name: "Bombilla".to_owned(),
            price: Price::parse("3").expect("valid"),
            stock: 5,
            code: ProductCode::parse("BOM").expect("valid"),
            image_url: None,
        };
        let json = serde_json::to_value(&draft).expect("serialize");
        assert!(json.get("image_url").is_none());
    }
}
