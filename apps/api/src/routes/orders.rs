//! # Order Routes
//!
//! ```text
//! POST   /api/orders                  createOrder     201 OrderDetail
//! GET    /api/orders/{id}             getOrder        200 OrderDetail
//! PUT    /api/orders/{id}             applyUpdate     200 OrderDetail
//! DELETE /api/orders/{id}             deleteOrder     204
//! POST   /api/orders/{id}/payment     recordPayment   201 Payment
//! GET    /api/branches/{id}/orders    listBranchOrders 200 [Order] (cached)
//! ```
//!
//! Mutating routes report the saga journal in the `x-galley-journal`
//! header.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::services::order_update::{OrderUpdateSaga, SagaJournal};
use crate::state::AppState;
use galley_core::cache_keys::branch_orders_key;
use galley_core::patch::{NewOrder, OrderPatch};
use galley_core::validation::validate_id;
use galley_core::{Order, OrderDetail, Payment, PaymentMethod};
use galley_relay::with_retry;

/// Orders returned by the branch listing.
pub const BRANCH_LIST_LIMIT: i64 = 100;

pub const JOURNAL_HEADER: &str = "x-galley-journal";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub method: String,
    #[serde(rename = "amount")]
    pub amount_cents: i64,
    #[serde(default)]
    pub reference: Option<String>,
}

pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(new) = payload?;
    debug!(branch_id = %new.branch_id, lines = new.lines.len(), "create_order");

    let outcome = OrderUpdateSaga::from_state(&state).create(&new).await?;
    Ok(with_journal(StatusCode::CREATED, Json(outcome.detail), &outcome.journal))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let detail = state.db.orders().get_detail(&order_id).await?;
    detail
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Order", &order_id))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    payload: Result<Json<OrderPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(patch) = payload?;
    debug!(order_id = %order_id, status = ?patch.status, "update_order");

    let outcome = OrderUpdateSaga::from_state(&state)
        .update(&order_id, &patch)
        .await?;
    Ok(with_journal(StatusCode::OK, Json(outcome.detail), &outcome.journal))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Response, ApiError> {
    let (_, journal) = OrderUpdateSaga::from_state(&state).delete(&order_id).await?;
    Ok(with_journal(StatusCode::NO_CONTENT, (), &journal))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    payload: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let Json(request) = payload?;
    let method: PaymentMethod = request.method.parse()?;

    let payment = state
        .db
        .payments()
        .record(
            &order_id,
            method,
            request.amount_cents,
            request.reference.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Newest orders of a branch, served from the cache when present.
///
/// Cache trouble degrades to a database read; it never fails the request.
pub async fn list_branch_orders(
    State(state): State<AppState>,
    Path(branch_id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    validate_id("branchId", &branch_id)?;

    let key = branch_orders_key(&branch_id);
    let policy = state.config.relay.cache_policy();

    match with_retry(&policy, "order list lookup", || state.cache.get(&key)).await {
        Ok(Some(cached)) => match serde_json::from_str::<Vec<Order>>(&cached) {
            Ok(orders) => {
                debug!(key = %key, "Order list served from cache");
                return Ok(Json(orders));
            }
            Err(e) => warn!(key = %key, error = %e, "Discarding undecodable cached order list"),
        },
        Ok(None) => {}
        Err(e) => warn!(key = %key, error = %e, "Order list cache lookup failed"),
    }

    let orders = state
        .db
        .orders()
        .list_for_branch(&branch_id, BRANCH_LIST_LIMIT)
        .await?;

    match serde_json::to_string(&orders) {
        Ok(encoded) => {
            let ttl = Some(state.config.relay.list_ttl());
            if let Err(e) =
                with_retry(&policy, "order list store", || state.cache.set(&key, &encoded, ttl)).await
            {
                warn!(key = %key, error = %e, "Order list could not be cached");
            }
        }
        Err(e) => warn!(key = %key, error = %e, "Order list could not be encoded"),
    }

    Ok(Json(orders))
}

fn with_journal(status: StatusCode, body: impl IntoResponse, journal: &SagaJournal) -> Response {
    let mut response = (status, body).into_response();
    if let Ok(value) = HeaderValue::from_str(&journal.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(JOURNAL_HEADER), value);
    }
    response
}
