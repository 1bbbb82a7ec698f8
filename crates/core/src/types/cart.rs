//! Cart row types.

use serde::{Deserialize, Serialize};

use super::id::{CartItemId, UserId};
use super::product::ProductCode;

/// A row of the remote `cart` table: one per (user, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_code: ProductCode,
    pub count: u32,
}

/// Payload for inserting a cart row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCartItem {
    pub user_id: UserId,
    pub product_code: ProductCode,
    pub count: u32,
}
