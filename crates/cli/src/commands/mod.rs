//! CLI command implementations.

pub mod config;
pub mod password;
pub mod user;
