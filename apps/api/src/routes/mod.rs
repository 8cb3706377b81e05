//! HTTP routes.

pub mod health;
pub mod inventory;
pub mod orders;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Builds the full router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Orders
        .route("/api/orders", post(orders::create_order))
        .route(
            "/api/orders/{id}",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/api/orders/{id}/payment", post(orders::record_payment))
        .route("/api/branches/{id}/orders", get(orders::list_branch_orders))
        // Inventory
        .route("/api/ingredients", post(inventory::create_ingredient))
        .route("/api/recipes", post(inventory::add_recipe_entry))
        .route("/api/menu-items/{id}/recipe", get(inventory::list_recipe))
        .route("/api/stock", post(inventory::add_stock))
        .route("/api/branches/{id}/stock", get(inventory::list_stock))
        .with_state(state)
}
