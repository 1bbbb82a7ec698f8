//! Route guard and authentication extractors.
//!
//! The decision itself is the pure [`evaluate`] function; the extractors
//! restore the session on every request and apply it. Nothing is cached
//! between requests.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use tiendita_core::Role;

use crate::models::{CurrentUser, SessionState};
use crate::services::SessionStore;

/// Path anonymous visitors are sent to.
pub const LOGIN_PATH: &str = "/login";

/// Outcome of the route guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not restored yet; render the loading view.
    Loading,
    /// Send the visitor elsewhere.
    Redirect(&'static str),
    /// Let the request through.
    Admit(CurrentUser),
}

/// Decide whether a request may proceed.
///
/// Rules, first match wins: an unrestored session shows the loading view;
/// no identity goes to `/login`; a role mismatch goes to the identity's home
/// (`/admin` for admins, `/` otherwise); anything else is admitted.
#[must_use]
pub fn evaluate(state: &SessionState, required: Option<Role>) -> GuardDecision {
    let user = match state {
        SessionState::Restoring => return GuardDecision::Loading,
        SessionState::Anonymous => return GuardDecision::Redirect(LOGIN_PATH),
        SessionState::Authenticated(user) => user,
    };

    match required {
        Some(role) if role != user.role => GuardDecision::Redirect(user.role.home_path()),
        Some(_) | None => GuardDecision::Admit(user.clone()),
    }
}

/// Neutral page shown while the session is being restored.
#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub path: String,
}

/// Error returned when the guard does not admit the request.
pub enum GuardRejection {
    /// Session not restored; render the loading view for this path.
    Loading(String),
    /// Redirect elsewhere.
    Redirect(&'static str),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Loading(path) => LoadingTemplate { path }.into_response(),
            Self::Redirect(to) => Redirect::to(to).into_response(),
        }
    }
}

/// Restore the session state carried by a request.
async fn restore(parts: &Parts) -> SessionState {
    match parts.extensions.get::<Session>() {
        Some(session) => SessionStore::new(session.clone()).restore().await,
        None => SessionState::Restoring,
    }
}

async fn guard(parts: &Parts, required: Option<Role>) -> Result<CurrentUser, GuardRejection> {
    match evaluate(&restore(parts).await, required) {
        GuardDecision::Admit(user) => Ok(user),
        GuardDecision::Redirect(to) => Err(GuardRejection::Redirect(to)),
        GuardDecision::Loading => Err(GuardRejection::Loading(parts.uri.path().to_string())),
    }
}

/// Extractor that requires a signed-in user of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Cart of {}", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, None).await.map(Self)
    }
}

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, Some(Role::Admin)).await.map(Self)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is
/// signed in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(restore(parts).await.user().cloned()))
    }
}
