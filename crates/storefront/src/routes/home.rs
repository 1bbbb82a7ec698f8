//! Home page: catalog, filters and the featured carousel.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use tiendita_core::{Product, ProductFilter};

use super::{NavView, Notice, NoticeQuery, NoticeView};
use crate::error::report_remote_failure;
use crate::middleware::OptionalAuth;
use crate::services::CatalogService;
use crate::state::AppState;

/// Query parameters of the catalog page.
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub min_price: String,
    #[serde(default)]
    pub max_price: String,
    pub notice: Option<String>,
}

/// Product card display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub code: String,
    pub name: String,
    pub price: String,
    pub stock: u32,
    pub image_url: Option<String>,
    pub badge_label: &'static str,
    pub badge_severity: &'static str,
    pub available: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let level = product.stock_level();
        Self {
            code: product.code.to_string(),
            name: product.name.clone(),
            price: product.price.to_string(),
            stock: product.stock,
            image_url: product.image_url.clone(),
            badge_label: level.label(),
            badge_severity: level.severity(),
            available: product.is_available(),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: NavView,
    pub notice: Option<NoticeView>,
    pub featured: Vec<ProductView>,
    pub products: Vec<ProductView>,
    pub q: String,
    pub min_price: String,
    pub max_price: String,
    pub filtered: bool,
}

/// Display the catalog.
///
/// A failed load renders an empty catalog with an error notice.
#[instrument(skip(state, user, query))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<HomeQuery>,
) -> impl IntoResponse {
    let catalog = CatalogService::new(state.backend(), state.catalog());
    let filter = ProductFilter::from_inputs(&query.q, &query.min_price, &query.max_price);

    let mut notice = NoticeQuery {
        notice: query.notice.clone(),
    }
    .view();

    let products = match catalog.search(&filter).await {
        Ok(products) => products.iter().map(ProductView::from).collect(),
        Err(e) => {
            report_remote_failure("Failed to load catalog", &e);
            notice = Some(Notice::RemoteFailure.into());
            Vec::new()
        }
    };

    let featured = match catalog.featured().await {
        Ok(products) => products.iter().map(ProductView::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load featured products");
            Vec::new()
        }
    };

    HomeTemplate {
        nav: NavView::for_user(user.as_ref()),
        notice,
        featured,
        products,
        q: query.q,
        min_price: query.min_price,
        max_price: query.max_price,
        filtered: !filter.is_empty(),
    }
}
