//! Tiendita Core - Shared domain types.
//!
//! This crate provides the types used across all Tiendita components:
//! - `storefront` - Catalog, cart and admin panel web application
//! - `cli` - Command-line tools for seeding identities and checking configuration
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session handling. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, usernames, roles, prices, products and cart rows

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
