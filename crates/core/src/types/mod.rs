//! Core types for Tiendita.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod credential;
pub mod filter;
pub mod id;
pub mod price;
pub mod product;
pub mod role;
pub mod username;

pub use cart::{CartItem, NewCartItem};
pub use credential::{DigestError, PasswordDigest};
pub use filter::ProductFilter;
pub use id::*;
pub use price::{Price, PriceError};
pub use product::{NewProduct, Product, ProductCode, ProductCodeError, StockLevel};
pub use role::{Role, RoleParseError};
pub use username::{Username, UsernameError};
