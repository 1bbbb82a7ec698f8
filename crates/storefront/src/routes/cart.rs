//! Cart route handlers.
//!
//! Every write is confirmed by the backend before the visitor is redirected
//! back to a freshly loaded cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use tiendita_core::{CartItemId, ProductCode};

use super::{NavView, Notice, NoticeQuery, NoticeView};
use crate::error::{add_breadcrumb, report_remote_failure};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::services::cart::total;
use crate::services::{CartError, CartLine, CartService, QuantityChange};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub code: String,
}

/// Quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub item_id: CartItemId,
    pub quantity: i64,
}

/// Remove form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub item_id: CartItemId,
}

// =============================================================================
// Views
// =============================================================================

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub item_id: String,
    pub code: String,
    pub name: String,
    pub image_url: Option<String>,
    pub price: String,
    pub quantity: u32,
    pub subtotal: String,
    pub stock: u32,
    pub can_increment: bool,
    pub decrement_to: u32,
    pub increment_to: u32,
    pub missing: bool,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        let count = line.item.count;
        let product = line.product.as_ref();
        Self {
            item_id: line.item.id.to_string(),
            code: line.item.product_code.to_string(),
            name: product.map_or_else(
                || line.item.product_code.to_string(),
                |p| p.name.clone(),
            ),
            image_url: product.and_then(|p| p.image_url.clone()),
            price: product.map_or_else(String::new, |p| p.price.to_string()),
            quantity: count,
            subtotal: line.subtotal().map_or_else(String::new, |p| p.to_string()),
            stock: product.map_or(0, |p| p.stock),
            can_increment: line.can_increment(),
            decrement_to: count.saturating_sub(1),
            increment_to: count.saturating_add(1),
            missing: product.is_none(),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub nav: NavView,
    pub notice: Option<NoticeView>,
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub item_count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

fn cart_notice(error: &CartError) -> Notice {
    match error {
        CartError::ProductNotFound => Notice::ProductMissing,
        CartError::OutOfStock => Notice::OutOfStock,
        CartError::StockExceeded { .. } => Notice::StockLimit,
        CartError::ItemNotFound => Notice::ItemMissing,
        CartError::Backend(e) => {
            report_remote_failure("Cart operation failed", e);
            Notice::RemoteFailure
        }
    }
}

/// Display the cart page.
#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    let cart = CartService::new(state.backend());
    let mut notice = query.view();

    let lines = match cart.lines(user.id).await {
        Ok(lines) => lines,
        Err(e) => {
            notice = Some(cart_notice(&e).into());
            Vec::new()
        }
    };

    CartTemplate {
        nav: NavView::for_user(Some(&user)),
        notice,
        total: total(&lines).to_string(),
        item_count: lines.iter().map(|l| l.item.count).sum(),
        lines: lines.iter().map(CartLineView::from).collect(),
    }
}

/// Add one unit of a product, then go back to the catalog.
///
/// Anonymous visitors are sent to the login page.
#[instrument(skip(state, user, form))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddForm>,
) -> Response {
    let Some(user) = user else {
        return Redirect::to("/login").into_response();
    };
    let Ok(code) = ProductCode::parse(&form.code) else {
        return Notice::ProductMissing.redirect("/").into_response();
    };

    let owner = format!("user:{}", user.id);
    let Some(_submission) = state.inflight().begin(owner, "cart_add") else {
        return Notice::Busy.redirect("/").into_response();
    };

    add_breadcrumb("cart", "Add to cart", &[("code", code.as_str())]);
    match CartService::new(state.backend()).add(user.id, &code).await {
        Ok(_) => Notice::Added.redirect("/").into_response(),
        Err(e) => cart_notice(&e).redirect("/").into_response(),
    }
}

/// Set a line's quantity; zero or less removes the line.
#[instrument(skip(state, user, form), fields(user_id = %user.id, item_id = %form.item_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateForm>,
) -> Response {
    let owner = format!("user:{}", user.id);
    let Some(_submission) = state.inflight().begin(owner, "cart_update") else {
        return Notice::Busy.redirect("/cart").into_response();
    };

    match CartService::new(state.backend())
        .set_quantity(user.id, form.item_id, form.quantity)
        .await
    {
        Ok(QuantityChange::Updated(_)) => Notice::Updated.redirect("/cart").into_response(),
        Ok(QuantityChange::Removed) => Notice::Removed.redirect("/cart").into_response(),
        Err(e) => cart_notice(&e).redirect("/cart").into_response(),
    }
}

/// Remove a line.
#[instrument(skip(state, user, form), fields(user_id = %user.id, item_id = %form.item_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveForm>,
) -> Response {
    let owner = format!("user:{}", user.id);
    let Some(_submission) = state.inflight().begin(owner, "cart_remove") else {
        return Notice::Busy.redirect("/cart").into_response();
    };

    match CartService::new(state.backend())
        .remove(user.id, form.item_id)
        .await
    {
        Ok(()) => Notice::Removed.redirect("/cart").into_response(),
        Err(e) => cart_notice(&e).redirect("/cart").into_response(),
    }
}

/// Checkout is not available yet.
pub async fn checkout(RequireAuth(_user): RequireAuth) -> Redirect {
    Notice::CheckoutSoon.redirect("/cart")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tiendita_core::{CartItem, Price, Product, ProductId, UserId};

    use super::*;

    fn line(count: u32, stock: Option<u32>) -> CartLine {
        let code = ProductCode::parse("ARZ").unwrap();
        CartLine {
            item: CartItem {
                id: CartItemId::generate(),
                user_id: UserId::generate(),
                product_code: code.clone(),
                count,
            },
            product: stock.map(|stock| Product {
                id: ProductId::generate(),
                name: "Arroz".to_string(),
                price: Price::parse("12.5").unwrap(),
                stock,
                code,
                image_url: None,
            }),
        }
    }

    #[test]
    fn test_line_view_at_stock() {
        let view = CartLineView::from(&line(3, Some(3)));
        assert!(!view.can_increment);
        assert_eq!(view.decrement_to, 2);
        assert_eq!(view.subtotal, "$37.50");
    }

    #[test]
    fn test_line_view_missing_product() {
        let view = CartLineView::from(&line(2, None));
        assert!(view.missing);
        assert_eq!(view.name, "ARZ");
        assert!(view.subtotal.is_empty());
    }

    #[test]
    fn test_cart_notice_mapping() {
        assert_eq!(cart_notice(&CartError::OutOfStock), Notice::OutOfStock);
        assert_eq!(
            cart_notice(&CartError::StockExceeded { available: 1 }),
            Notice::StockLimit
        );
        assert_eq!(cart_notice(&CartError::ItemNotFound), Notice::ItemMissing);
    }
}
