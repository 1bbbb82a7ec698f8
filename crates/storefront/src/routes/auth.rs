//! Authentication route handlers.
//!
//! Handles login, registration and logout against the remote `users`
//! table. Password checks run before any remote call.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use tiendita_core::Username;

use super::{NavView, Notice, NoticeQuery, NoticeView};
use crate::error::{clear_sentry_user, report_remote_failure, set_sentry_user};
use crate::middleware::OptionalAuth;
use crate::services::auth::validate_password;
use crate::services::{AuthError, AuthService, SessionStore};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: NavView,
    pub notice: Option<NoticeView>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: NavView,
    pub notice: Option<NoticeView>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
///
/// Signed-in visitors are sent to their role's home instead.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NoticeQuery>,
) -> Response {
    if let Some(user) = user {
        return Redirect::to(user.role.home_path()).into_response();
    }

    LoginTemplate {
        nav: NavView::default(),
        notice: query.view(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: SessionStore,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(_submission) = state.inflight().begin(session.owner_key().await, "login") else {
        return Notice::Busy.redirect("/login").into_response();
    };

    let auth = AuthService::new(state.backend(), &session);
    match auth.login(&form.username, &form.password).await {
        Ok(user) => {
            set_sentry_user(&user.id, user.username.as_str());
            Redirect::to(user.role.home_path()).into_response()
        }
        Err(AuthError::Session(e)) => {
            report_remote_failure("Failed to store session", &e);
            Notice::SessionFailed.redirect("/login").into_response()
        }
        Err(e) => {
            tracing::info!(error = %e, "Login rejected");
            Notice::InvalidCredentials.redirect("/login").into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        nav: NavView::for_user(user.as_ref()),
        notice: query.view(),
    }
}

/// Check the form locally; nothing here touches the backend.
fn check_registration(form: &RegisterForm) -> Result<(), Notice> {
    if form.password != form.password_confirm {
        return Err(Notice::PasswordMismatch);
    }
    validate_password(&form.password).map_err(Notice::Policy)?;
    Username::parse(&form.username).map_err(|_| Notice::InvalidUsername)?;
    Ok(())
}

/// Handle registration form submission.
///
/// Creates a customer account; the visitor then signs in.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: SessionStore,
    Form(form): Form<RegisterForm>,
) -> Response {
    if let Err(notice) = check_registration(&form) {
        return notice.redirect("/register").into_response();
    }

    let Some(_submission) = state
        .inflight()
        .begin(session.owner_key().await, "register")
    else {
        return Notice::Busy.redirect("/register").into_response();
    };

    let auth = AuthService::new(state.backend(), &session);
    match auth.register(&form.username, &form.password).await {
        Ok(()) => Notice::Registered.redirect("/login").into_response(),
        Err(AuthError::UsernameTaken) => {
            Notice::UsernameTaken.redirect("/register").into_response()
        }
        Err(AuthError::InvalidUsername(_)) => {
            Notice::InvalidUsername.redirect("/register").into_response()
        }
        Err(_) => Notice::RegistrationFailed.redirect("/register").into_response(),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
pub async fn logout(State(state): State<AppState>, session: SessionStore) -> Response {
    AuthService::new(state.backend(), &session).logout().await;
    clear_sentry_user();
    Notice::LoggedOut.redirect("/login").into_response()
}
