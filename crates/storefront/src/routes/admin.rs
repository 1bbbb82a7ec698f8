//! Admin panel route handlers.
//!
//! Every handler requires the Admin role. Product forms are multipart so an
//! image can travel with the fields.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use tiendita_core::{Product, ProductId};

use super::{NavView, Notice, NoticeQuery, NoticeView};
use crate::error::{AppError, REMOTE_FAILURE_MESSAGE, add_breadcrumb, report_remote_failure};
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::services::{AdminError, AdminService, ImageUpload, ProductForm};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Product row display data for the admin table.
#[derive(Debug, Clone)]
pub struct AdminProductView {
    pub id: String,
    pub code: String,
    pub name: String,
    pub price: String,
    pub stock: u32,
    pub image_url: Option<String>,
    pub badge_label: &'static str,
    pub badge_severity: &'static str,
}

impl From<&Product> for AdminProductView {
    fn from(product: &Product) -> Self {
        let level = product.stock_level();
        Self {
            id: product.id.to_string(),
            code: product.code.to_string(),
            name: product.name.clone(),
            price: product.price.to_string(),
            stock: product.stock,
            image_url: product.image_url.clone(),
            badge_label: level.label(),
            badge_severity: level.severity(),
        }
    }
}

/// Admin product list with the create form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub nav: NavView,
    pub notice: Option<NoticeView>,
    pub products: Vec<AdminProductView>,
    pub form: ProductForm,
}

/// Product edit form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit.html")]
pub struct AdminEditTemplate {
    pub nav: NavView,
    pub notice: Option<NoticeView>,
    pub id: String,
    pub form: ProductForm,
    pub image_url: Option<String>,
}

// =============================================================================
// Multipart
// =============================================================================

/// Read the product fields and optional image of a multipart submission.
///
/// An empty file input means "no new image".
async fn read_product_form(
    mut multipart: Multipart,
) -> Result<(ProductForm, Option<ImageUpload>), AppError> {
    let mut form = ProductForm::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "name" => form.name = value,
            "price" => form.price = value,
            "stock" => form.stock = value,
            "code" => form.code = value,
            _ => {}
        }
    }

    Ok((form, image))
}

/// Error notice for a failed save.
fn save_error_notice(error: &AdminError) -> NoticeView {
    match error {
        AdminError::Form(e) => NoticeView::error(e.to_string()),
        AdminError::DuplicateCode | AdminError::InvalidImage(_) => {
            NoticeView::error(error.to_string())
        }
        AdminError::NotFound => Notice::ProductNotFound.into(),
        AdminError::Backend(e) => {
            report_remote_failure("Product save failed", e);
            NoticeView::error(REMOTE_FAILURE_MESSAGE)
        }
    }
}

async fn render_index(
    state: &AppState,
    user: &CurrentUser,
    mut notice: Option<NoticeView>,
    form: ProductForm,
) -> AdminIndexTemplate {
    let admin = AdminService::new(state.backend(), state.catalog());
    let products = match admin.products().await {
        Ok(products) => products.iter().map(AdminProductView::from).collect(),
        Err(e) => {
            if let AdminError::Backend(ref inner) = e {
                report_remote_failure("Failed to load products", inner);
            }
            notice.get_or_insert_with(|| NoticeView::error(REMOTE_FAILURE_MESSAGE));
            Vec::new()
        }
    };

    AdminIndexTemplate {
        nav: NavView::for_user(Some(user)),
        notice,
        products,
        form,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Product list and create form.
#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    render_index(&state, &user, query.view(), ProductForm::default()).await
}

/// Create a product.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let owner = format!("user:{}", user.id);
    let Some(_submission) = state.inflight().begin(owner, "admin_save") else {
        return Ok(Notice::Busy.redirect("/admin").into_response());
    };

    let (form, image) = read_product_form(multipart).await?;
    let product = match form.validate() {
        Ok(product) => product,
        Err(e) => {
            let notice = save_error_notice(&AdminError::Form(e));
            return Ok(render_index(&state, &user, Some(notice), form)
                .await
                .into_response());
        }
    };

    add_breadcrumb("admin", "Create product", &[("code", product.code.as_str())]);
    let admin = AdminService::new(state.backend(), state.catalog());
    match admin.create(product, image).await {
        Ok(_) => Ok(Notice::ProductCreated.redirect("/admin").into_response()),
        Err(e) => {
            let notice = save_error_notice(&e);
            Ok(render_index(&state, &user, Some(notice), form)
                .await
                .into_response())
        }
    }
}

/// Edit form for one product.
#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<ProductId>,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    let admin = AdminService::new(state.backend(), state.catalog());
    match admin.product(id).await {
        Ok(product) => Ok(AdminEditTemplate {
            nav: NavView::for_user(Some(&user)),
            notice: query.view(),
            id: product.id.to_string(),
            form: ProductForm::from_product(&product),
            image_url: product.image_url,
        }
        .into_response()),
        Err(AdminError::NotFound) => Ok(Notice::ProductNotFound.redirect("/admin").into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Update a product, keeping its image unless a new one is uploaded.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let owner = format!("user:{}", user.id);
    let Some(_submission) = state.inflight().begin(owner, "admin_save") else {
        return Ok(Notice::Busy
            .redirect(&format!("/admin/products/{id}/edit"))
            .into_response());
    };

    let (form, image) = read_product_form(multipart).await?;
    let admin = AdminService::new(state.backend(), state.catalog());
    let result = match form.validate() {
        Ok(product) => {
            add_breadcrumb("admin", "Update product", &[("code", product.code.as_str())]);
            admin.update(id, product, image).await
        }
        Err(e) => Err(AdminError::Form(e)),
    };

    match result {
        Ok(_) => Ok(Notice::ProductUpdated.redirect("/admin").into_response()),
        Err(AdminError::NotFound) => Ok(Notice::ProductNotFound.redirect("/admin").into_response()),
        Err(e) => {
            let image_url = admin.product(id).await.ok().and_then(|p| p.image_url);
            Ok(AdminEditTemplate {
                nav: NavView::for_user(Some(&user)),
                notice: Some(save_error_notice(&e)),
                id: id.to_string(),
                form,
                image_url,
            }
            .into_response())
        }
    }
}

/// Delete a product.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Redirect {
    let owner = format!("user:{}", user.id);
    let Some(_submission) = state.inflight().begin(owner, "admin_delete") else {
        return Notice::Busy.redirect("/admin");
    };

    let admin = AdminService::new(state.backend(), state.catalog());
    match admin.delete(id).await {
        Ok(()) => Notice::ProductDeleted.redirect("/admin"),
        Err(AdminError::NotFound) => Notice::ProductNotFound.redirect("/admin"),
        Err(e) => {
            if let AdminError::Backend(ref inner) = e {
                report_remote_failure("Product delete failed", inner);
            }
            Notice::RemoteFailure.redirect("/admin")
        }
    }
}
