//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                             - Catalog with filters and carousel
//!
//! # Auth
//! GET  /login                        - Login page
//! POST /login                        - Login action
//! GET  /register                     - Register page
//! POST /register                     - Register action
//! POST /logout                       - Logout action
//!
//! # Cart (requires auth)
//! GET  /cart                         - Cart page
//! POST /cart/add                     - Add one unit
//! POST /cart/update                  - Set quantity (0 removes)
//! POST /cart/remove                  - Remove row
//! POST /cart/checkout                - Checkout placeholder
//!
//! # Admin (requires Admin role)
//! GET  /admin                        - Product list and create form
//! POST /admin/products               - Create product
//! GET  /admin/products/{id}/edit     - Edit form
//! POST /admin/products/{id}          - Update product
//! POST /admin/products/{id}/delete   - Delete product
//! ```
//!
//! Any other path redirects to `/`.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod home;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;

use crate::config::StorefrontConfig;
use crate::middleware::auth_rate_limiter;
use crate::models::CurrentUser;
use crate::services::PasswordPolicyError;
use crate::services::admin::MAX_IMAGE_BYTES;
use crate::state::AppState;

// =============================================================================
// Notices
// =============================================================================

/// Short message shown after a redirect, carried as `?notice=<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    // Auth
    InvalidCredentials,
    SessionFailed,
    PasswordMismatch,
    Policy(PasswordPolicyError),
    InvalidUsername,
    UsernameTaken,
    RegistrationFailed,
    Registered,
    LoggedOut,
    // Cart
    Added,
    Updated,
    Removed,
    OutOfStock,
    StockLimit,
    ProductMissing,
    ItemMissing,
    CheckoutSoon,
    // Admin
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    ProductNotFound,
    // Shared
    Busy,
    RemoteFailure,
}

impl Notice {
    const ALL: [Self; 27] = [
        Self::InvalidCredentials,
        Self::SessionFailed,
        Self::PasswordMismatch,
        Self::Policy(PasswordPolicyError::TooShort),
        Self::Policy(PasswordPolicyError::MissingUppercase),
        Self::Policy(PasswordPolicyError::MissingLowercase),
        Self::Policy(PasswordPolicyError::MissingDigit),
        Self::Policy(PasswordPolicyError::MissingSpecial),
        Self::InvalidUsername,
        Self::UsernameTaken,
        Self::RegistrationFailed,
        Self::Registered,
        Self::LoggedOut,
        Self::Added,
        Self::Updated,
        Self::Removed,
        Self::OutOfStock,
        Self::StockLimit,
        Self::ProductMissing,
        Self::ItemMissing,
        Self::CheckoutSoon,
        Self::ProductCreated,
        Self::ProductUpdated,
        Self::ProductDeleted,
        Self::ProductNotFound,
        Self::Busy,
        Self::RemoteFailure,
    ];

    /// Query-string code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "credentials",
            Self::SessionFailed => "session",
            Self::PasswordMismatch => "password_mismatch",
            Self::Policy(PasswordPolicyError::TooShort) => "password_short",
            Self::Policy(PasswordPolicyError::MissingUppercase) => "password_uppercase",
            Self::Policy(PasswordPolicyError::MissingLowercase) => "password_lowercase",
            Self::Policy(PasswordPolicyError::MissingDigit) => "password_digit",
            Self::Policy(PasswordPolicyError::MissingSpecial) => "password_special",
            Self::InvalidUsername => "username_invalid",
            Self::UsernameTaken => "username_taken",
            Self::RegistrationFailed => "registration_failed",
            Self::Registered => "registered",
            Self::LoggedOut => "logged_out",
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Removed => "removed",
            Self::OutOfStock => "out_of_stock",
            Self::StockLimit => "stock_limit",
            Self::ProductMissing => "product_missing",
            Self::ItemMissing => "item_missing",
            Self::CheckoutSoon => "checkout",
            Self::ProductCreated => "product_created",
            Self::ProductUpdated => "product_updated",
            Self::ProductDeleted => "product_deleted",
            Self::ProductNotFound => "product_not_found",
            Self::Busy => "busy",
            Self::RemoteFailure => "remote",
        }
    }

    /// Text shown to the visitor.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid username or password.",
            Self::SessionFailed => "Could not start your session. Please try again.",
            Self::PasswordMismatch => "Passwords do not match.",
            Self::Policy(PasswordPolicyError::TooShort) => {
                "Password must be at least 8 characters long."
            }
            Self::Policy(PasswordPolicyError::MissingUppercase) => {
                "Password must contain at least one uppercase letter."
            }
            Self::Policy(PasswordPolicyError::MissingLowercase) => {
                "Password must contain at least one lowercase letter."
            }
            Self::Policy(PasswordPolicyError::MissingDigit) => {
                "Password must contain at least one number."
            }
            Self::Policy(PasswordPolicyError::MissingSpecial) => {
                "Password must contain at least one special character."
            }
            Self::InvalidUsername => "Usernames cannot be empty or contain spaces.",
            Self::UsernameTaken => "That username already exists.",
            Self::RegistrationFailed => "Registration failed. Please try again.",
            Self::Registered => "Account created. You can sign in now.",
            Self::LoggedOut => "You have been signed out.",
            Self::Added => "Product added to your cart.",
            Self::Updated => "Quantity updated.",
            Self::Removed => "Product removed from your cart.",
            Self::OutOfStock => "This product is out of stock.",
            Self::StockLimit => "You already have all the available units in your cart.",
            Self::ProductMissing => "That product no longer exists.",
            Self::ItemMissing => "That item is no longer in your cart.",
            Self::CheckoutSoon => "Checkout is coming soon.",
            Self::ProductCreated => "Product created.",
            Self::ProductUpdated => "Product updated.",
            Self::ProductDeleted => "Product deleted.",
            Self::ProductNotFound => "Product not found.",
            Self::Busy => "Your previous request is still being processed. Please wait.",
            Self::RemoteFailure => crate::error::REMOTE_FAILURE_MESSAGE,
        }
    }

    /// Whether the notice reports a failure.
    #[must_use]
    pub const fn is_error(self) -> bool {
        !matches!(
            self,
            Self::Registered
                | Self::LoggedOut
                | Self::Added
                | Self::Updated
                | Self::Removed
                | Self::CheckoutSoon
                | Self::ProductCreated
                | Self::ProductUpdated
                | Self::ProductDeleted
        )
    }

    /// Look up a notice by its query-string code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.code() == code)
    }

    /// Redirect to `path` carrying this notice.
    #[must_use]
    pub fn redirect(self, path: &str) -> Redirect {
        Redirect::to(&format!("{path}?notice={}", self.code()))
    }
}

/// Query parameter carrying a notice code.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

impl NoticeQuery {
    /// The notice to display, ignoring unknown codes.
    #[must_use]
    pub fn view(&self) -> Option<NoticeView> {
        self.notice
            .as_deref()
            .and_then(Notice::from_code)
            .map(NoticeView::from)
    }
}

/// Notice display data for templates.
#[derive(Debug, Clone)]
pub struct NoticeView {
    pub message: String,
    pub kind: &'static str,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        Self {
            message: notice.message().to_string(),
            kind: if notice.is_error() { "error" } else { "success" },
        }
    }
}

impl NoticeView {
    /// A free-text error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: "error",
        }
    }
}

/// Navigation bar display data.
#[derive(Debug, Clone, Default)]
pub struct NavView {
    pub username: Option<String>,
    pub is_admin: bool,
}

impl NavView {
    /// Navigation for the given visitor.
    #[must_use]
    pub fn for_user(user: Option<&CurrentUser>) -> Self {
        user.map_or_else(Self::default, |u| Self {
            username: Some(u.username.to_string()),
            is_admin: u.role.is_admin(),
        })
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
///
/// Rate limited per client IP.
pub fn auth_routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .layer(auth_rate_limiter(config.trust_proxy_headers))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Room for the text fields of a product form next to its image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/products", post(admin::create))
        .route("/products/{id}", post(admin::update))
        .route("/products/{id}/edit", get(admin::edit))
        .route("/products/{id}/delete", post(admin::delete))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES))
}

/// Create all routes for the storefront.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(auth_routes(config))
        .route("/logout", post(auth::logout))
        .nest("/cart", cart_routes())
        .nest("/admin", admin_routes())
        .fallback(|| async { Redirect::to("/") })
}
