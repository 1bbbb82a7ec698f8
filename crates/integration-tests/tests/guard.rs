//! Integration tests for the route guard and health checks.

use tiendita_core::Role;
use tiendita_integration_tests::TestApp;

#[tokio::test]
async fn test_anonymous_visitor_sent_to_login() {
    let mut app = TestApp::new();

    assert!(app.get("/cart").await.redirects_to("/login"));
    assert!(app.get("/admin").await.redirects_to("/login"));
}

#[tokio::test]
async fn test_customer_kept_out_of_admin() {
    let mut app = TestApp::new();
    app.login_as("ana", Role::Customer).await;

    assert!(app.get("/admin").await.redirects_to("/"));

    let response = app
        .post_multipart(
            "/admin/products",
            &[("name", "Arroz"), ("price", "1"), ("stock", "1"), ("code", "ARZ")],
            None,
        )
        .await;
    assert!(response.redirects_to("/"));
    assert!(app.backend.products().await.is_empty());
}

#[tokio::test]
async fn test_admin_admitted_to_cart() {
    let mut app = TestApp::new();
    app.login_as("root", Role::Admin).await;

    assert_eq!(app.get("/cart").await.status, 200);
    assert_eq!(app.get("/admin").await.status, 200);
}

#[tokio::test]
async fn test_unknown_path_redirects_home() {
    let mut app = TestApp::new();

    assert!(app.get("/no/such/page").await.redirects_to("/"));
}

#[tokio::test]
async fn test_catalog_is_public() {
    let mut app = TestApp::new();

    let response = app.get("/").await;
    assert_eq!(response.status, 200);
    assert!(response.body.contains("Sign in"));
}

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let health = app.get("/health").await;
    assert_eq!(health.status, 200);
    assert_eq!(health.body, "ok");

    assert_eq!(app.get("/health/ready").await.status, 200);

    app.backend.set_offline(true);
    assert_eq!(app.get("/health/ready").await.status, 503);
}
