//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Username/password login and registration
//! - `session` - Persisted identity of the browser session
//! - `catalog` - Cached product listings
//! - `cart` - Cart rows of the signed-in user
//! - `admin` - Product management
//! - `inflight` - Duplicate form submission guard
//!
//! Services borrow the backend and are built per request.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod inflight;
pub mod session;

pub use admin::{AdminError, AdminService, ImageUpload, ProductForm, ProductFormError};
pub use auth::{AuthError, AuthService, PasswordPolicyError};
pub use cart::{CartError, CartLine, CartService, QuantityChange};
pub use catalog::{CatalogCache, CatalogError, CatalogService};
pub use inflight::{InFlight, InFlightGuard};
pub use session::SessionStore;
