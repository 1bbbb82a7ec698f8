//! Integration tests for registration, login and logout.

#![allow(clippy::unwrap_used)]

use tiendita_core::{Role, Username};
use tiendita_integration_tests::{PASSWORD, TestApp};
use tiendita_storefront::services::auth::hash_password;

fn register_fields<'a>(
    username: &'a str,
    password: &'a str,
    confirm: &'a str,
) -> [(&'a str, &'a str); 3] {
    [
        ("username", username),
        ("password", password),
        ("password_confirm", confirm),
    ]
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_creates_customer_with_digest() {
    let mut app = TestApp::new();

    let response = app
        .post_form("/register", &register_fields("ana", PASSWORD, PASSWORD))
        .await;
    assert!(response.redirects_to("/login?notice=registered"));

    let users = app.backend.users().await;
    assert_eq!(users.len(), 1);
    assert_eq!(users.first().unwrap().role, Role::Customer);

    let digest = app
        .backend
        .digest_of(&Username::parse("ana").unwrap())
        .await
        .unwrap();
    assert_eq!(digest, hash_password(PASSWORD));
}

#[tokio::test]
async fn test_register_rejects_mismatch_before_policy() {
    let mut app = TestApp::new();

    let response = app
        .post_form("/register", &register_fields("ana", "weak", "other"))
        .await;
    assert!(response.redirects_to("/register?notice=password_mismatch"));
    assert!(app.backend.users().await.is_empty());
}

#[tokio::test]
async fn test_register_reports_policy_failure() {
    let mut app = TestApp::new();

    let response = app
        .post_form("/register", &register_fields("ana", "abc123!@", "abc123!@"))
        .await;
    assert!(response.redirects_to("/register?notice=password_uppercase"));
    assert!(app.backend.users().await.is_empty());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let mut app = TestApp::new();
    app.seed_user("ana", Role::Customer).await;

    let response = app
        .post_form("/register", &register_fields("ana", PASSWORD, PASSWORD))
        .await;
    assert!(response.redirects_to("/register?notice=username_taken"));
    assert_eq!(app.backend.users().await.len(), 1);
}

#[tokio::test]
async fn test_register_page_shows_notice() {
    let mut app = TestApp::new();

    let response = app.get("/register?notice=username_taken").await;
    assert_eq!(response.status, 200);
    assert!(response.body.contains("That username already exists."));
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_customer_goes_home() {
    let mut app = TestApp::new();

    let response = app.login_as("ana", Role::Customer).await;
    assert!(response.redirects_to("/"));

    let home = app.get("/").await;
    assert!(home.body.contains("ana"));
    assert!(home.body.contains("href=\"/cart\""));
}

#[tokio::test]
async fn test_login_admin_goes_to_admin() {
    let mut app = TestApp::new();

    let response = app.login_as("root", Role::Admin).await;
    assert!(response.redirects_to("/admin"));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let mut app = TestApp::new();
    app.seed_user("ana", Role::Customer).await;

    let response = app
        .post_form("/login", &[("username", "ana"), ("password", "Wrong123!")])
        .await;
    assert!(response.redirects_to("/login?notice=credentials"));

    let cart = app.get("/cart").await;
    assert!(cart.redirects_to("/login"));
}

#[tokio::test]
async fn test_login_unknown_user_same_message() {
    let mut app = TestApp::new();

    let response = app
        .post_form("/login", &[("username", "nobody"), ("password", PASSWORD)])
        .await;
    assert!(response.redirects_to("/login?notice=credentials"));
}

#[tokio::test]
async fn test_login_backend_down_reads_as_bad_credentials() {
    let mut app = TestApp::new();
    app.seed_user("ana", Role::Customer).await;
    app.backend.set_offline(true);

    let response = app
        .post_form("/login", &[("username", "ana"), ("password", PASSWORD)])
        .await;
    assert!(response.redirects_to("/login?notice=credentials"));
}

#[tokio::test]
async fn test_login_page_redirects_signed_in_visitor() {
    let mut app = TestApp::new();
    app.login_as("root", Role::Admin).await;

    let response = app.get("/login").await;
    assert!(response.redirects_to("/admin"));
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_clears_session() {
    let mut app = TestApp::new();
    app.login_as("ana", Role::Customer).await;
    assert_eq!(app.get("/cart").await.status, 200);

    let response = app.post_form("/logout", &[]).await;
    assert!(response.redirects_to("/login?notice=logged_out"));

    let cart = app.get("/cart").await;
    assert!(cart.redirects_to("/login"));
}
