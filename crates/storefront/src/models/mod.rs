//! Domain models for storefront.

pub mod session;
pub mod user;

pub use session::{CurrentUser, SessionState};
pub use user::{NewUser, User};
