//! REST client for the hosted backend.
//!
//! Talks PostgREST for table rows and the storage API for bucket uploads,
//! using `reqwest` 0.13 with a per-request timeout.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use tiendita_core::{
    CartItem, CartItemId, NewCartItem, NewProduct, PasswordDigest, Product, ProductCode,
    ProductId, UserId, Username,
};

use super::{BackendError, CartTable, ImageBucket, ProductTable, UNIQUE_VIOLATION, UserTable};
use crate::config::BackendConfig;
use crate::models::{NewUser, User};

/// Media type asking PostgREST for a single JSON object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgREST code for "0 or more than 1 rows returned" on a single-object read.
const NOT_SINGLE_ROW: &str = "PGRST116";

const USER_COLUMNS: &str = "id,username,role";

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend's REST and storage endpoints.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    rest_base: String,
    storage_base: String,
    api_key: SecretString,
    bucket: String,
}

/// Error body returned by PostgREST and the storage API.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    /// Storage API uses `error` instead of `code`.
    error: Option<String>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let base = config.url.as_str().trim_end_matches('/');

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                rest_base: format!("{base}/rest/v1"),
                storage_base: format!("{base}/storage/v1"),
                api_key: config.anon_key.clone(),
                bucket: config.image_bucket.clone(),
            }),
        })
    }

    /// Build a table URL with query parameters.
    fn table_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url, BackendError> {
        let base = format!("{}/{table}", self.inner.rest_base);
        Ok(Url::parse_with_params(&base, params)?)
    }

    /// Public URL of an object in the image bucket.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{path}",
            self.inner.storage_base, self.inner.bucket
        )
    }

    /// Start a request carrying the API key headers.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let key = self.inner.api_key.expose_secret();
        self.inner
            .client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let error = api_error(status, &body);
            tracing::warn!(
                status = %status,
                error = %error,
                "Backend returned non-success status"
            );
            return Err(error);
        }

        Ok(body)
    }

    /// Send a request and decode the JSON body.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// GET rows of a table.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let url = self.table_url(table, params)?;
        self.fetch(self.request(Method::GET, url)).await
    }

    /// POST one row and return the stored representation.
    async fn insert<B, T>(&self, table: &str, row: &B) -> Result<T, BackendError>
    where
        B: serde::Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, &[])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(row);
        self.fetch(request).await
    }
}

/// Map an error response to a [`BackendError`].
fn api_error(status: StatusCode, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.or(parsed.error);
    let message = [parsed.message, parsed.details, parsed.hint]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" / ");
    let message = if message.is_empty() {
        body.chars().take(200).collect()
    } else {
        message
    };

    if code.as_deref() == Some(UNIQUE_VIOLATION) || status == StatusCode::CONFLICT {
        return BackendError::UniqueViolation(message);
    }

    if code.as_deref() == Some(NOT_SINGLE_ROW) || status == StatusCode::NOT_ACCEPTABLE {
        return BackendError::NotSingleRow;
    }

    BackendError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

// =============================================================================
// Tables
// =============================================================================

#[async_trait]
impl UserTable for BackendClient {
    #[instrument(skip(self, digest), fields(username = %username))]
    async fn find_by_credentials(
        &self,
        username: &Username,
        digest: &PasswordDigest,
    ) -> Result<User, BackendError> {
        let url = self.table_url(
            "users",
            &[
                ("select", USER_COLUMNS.to_string()),
                ("username", eq(username)),
                ("password", eq(digest.as_str())),
            ],
        )?;
        let request = self.request(Method::GET, url).header("Accept", SINGLE_OBJECT);
        self.fetch(request).await
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert_user(&self, user: &NewUser) -> Result<User, BackendError> {
        let url = self.table_url("users", &[("select", USER_COLUMNS.to_string())])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(user);
        self.fetch(request).await
    }
}

#[async_trait]
impl ProductTable for BackendClient {
    #[instrument(skip(self))]
    async fn list_products(&self, limit: Option<usize>) -> Result<Vec<Product>, BackendError> {
        let mut params = vec![("select", "*".to_string()), ("order", "name.asc".to_string())];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        let products: Vec<Product> = self.select("products", &params).await?;
        debug!(count = products.len(), "Fetched products");
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        let rows: Vec<Product> = self
            .select("products", &[("id", eq(id)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self), fields(code = %code))]
    async fn product_by_code(&self, code: &ProductCode) -> Result<Option<Product>, BackendError> {
        let rows: Vec<Product> = self
            .select("products", &[("code", eq(code)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, product), fields(code = %product.code))]
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError> {
        self.insert("products", product).await
    }

    #[instrument(skip(self, product), fields(product_id = %id))]
    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Option<Product>, BackendError> {
        let url = self.table_url("products", &[("id", eq(id))])?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(product);
        let rows: Vec<Product> = self.fetch(request).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete_product(&self, id: ProductId) -> Result<(), BackendError> {
        let url = self.table_url("products", &[("id", eq(id))])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[async_trait]
impl CartTable for BackendClient {
    #[instrument(skip(self), fields(user_id = %user))]
    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>, BackendError> {
        self.select(
            "cart",
            &[("user_id", eq(user)), ("order", "product_code.asc".to_string())],
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user, code = %code))]
    async fn cart_item_for_product(
        &self,
        user: UserId,
        code: &ProductCode,
    ) -> Result<Option<CartItem>, BackendError> {
        let rows: Vec<CartItem> = self
            .select(
                "cart",
                &[
                    ("user_id", eq(user)),
                    ("product_code", eq(code)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self), fields(user_id = %user, item_id = %id))]
    async fn cart_item(
        &self,
        user: UserId,
        id: CartItemId,
    ) -> Result<Option<CartItem>, BackendError> {
        let rows: Vec<CartItem> = self
            .select("cart", &[("id", eq(id)), ("user_id", eq(user))])
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, item), fields(user_id = %item.user_id, code = %item.product_code))]
    async fn insert_cart_item(&self, item: &NewCartItem) -> Result<CartItem, BackendError> {
        self.insert("cart", item).await
    }

    #[instrument(skip(self), fields(user_id = %user, item_id = %id))]
    async fn set_cart_count(
        &self,
        user: UserId,
        id: CartItemId,
        count: u32,
    ) -> Result<(), BackendError> {
        let url = self.table_url("cart", &[("id", eq(id)), ("user_id", eq(user))])?;
        let request = self
            .request(Method::PATCH, url)
            .json(&json!({ "count": count }));
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user, item_id = %id))]
    async fn delete_cart_item(&self, user: UserId, id: CartItemId) -> Result<(), BackendError> {
        let url = self.table_url("cart", &[("id", eq(id)), ("user_id", eq(user))])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageBucket for BackendClient {
    #[instrument(skip(self, bytes), fields(bucket = %self.inner.bucket, size = bytes.len()))]
    async fn upload_image(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        let object = format!(
            "{}/object/{}/{path}",
            self.inner.storage_base, self.inner.bucket
        );
        let url = Url::parse(&object)?;

        let request = self
            .request(Method::POST, url)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        self.send(request).await?;

        Ok(self.public_url(path))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client() -> BackendClient {
        let config = BackendConfig {
            url: Url::parse("https://abc.supabase.co/").unwrap(),
            anon_key: SecretString::from("anon-key"),
            image_bucket: "product-images".to_string(),
            timeout: Duration::from_secs(5),
        };
        BackendClient::new(&config).unwrap()
    }

    #[test]
    fn test_table_url_encodes_filters() {
        let url = client()
            .table_url(
                "users",
                &[("select", USER_COLUMNS.to_string()), ("username", eq("ana maria"))],
            )
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/users");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "id,username,role".to_string()),
                ("username".to_string(), "eq.ana maria".to_string()),
            ]
        );
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            client().public_url("products/abc.png"),
            "https://abc.supabase.co/storage/v1/object/public/product-images/products/abc.png"
        );
    }

    #[test]
    fn test_api_error_unique_violation_by_code() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint \"users_username_key\"","details":null,"hint":null}"#;
        let err = api_error(StatusCode::CONFLICT, body);
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_api_error_unique_violation_by_status() {
        let err = api_error(StatusCode::CONFLICT, "");
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_api_error_not_single_row() {
        let body = r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned","details":"The result contains 0 rows","hint":null}"#;
        let err = api_error(StatusCode::NOT_ACCEPTABLE, body);
        assert!(matches!(err, BackendError::NotSingleRow));
    }

    #[test]
    fn test_api_error_generic() {
        let body = r#"{"code":"42P01","message":"relation \"public.cart\" does not exist","details":null,"hint":"Run the setup script"}"#;
        match api_error(StatusCode::NOT_FOUND, body) {
            BackendError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("42P01"));
                assert!(message.contains("does not exist"));
                assert!(message.contains("Run the setup script"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_storage_body() {
        let body = r#"{"statusCode":"403","error":"Unauthorized","message":"new row violates row-level security policy"}"#;
        match api_error(StatusCode::FORBIDDEN, body) {
            BackendError::Api { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("Unauthorized"));
                assert!(message.contains("row-level security"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_non_json_body() {
        match api_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") {
            BackendError::Api { message, .. } => assert!(message.contains("bad gateway")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
