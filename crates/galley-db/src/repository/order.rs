//! # Order Repository
//!
//! Order persistence and the order-update transaction.
//!
//! ## Update Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE                           locked ───► wait, then Busy  │
//! │   1. SELECT order                          missing ──► NotFound         │
//! │   2. status.check_transition(next)         backward ─► InvalidTransition│
//! │   3. paid order + line edits?              yes ──────► OrderLocked      │
//! │   4. UPDATE orders ... WHERE status = <read status>                     │
//! │                                            0 rows ───► Conflict         │
//! │   5. reconcile lines                       bad id ───► OrderLineNotFound│
//! │   6. if Transition::EnterPaid                                           │
//! │        load recipes (once per menu item)                                │
//! │        DeductionPlan::build                overflow ─► QuantityOverflow │
//! │        stock ledger batch (deadline)       strict ───► InsufficientStock│
//! │                                            slow ─────► Timeout          │
//! │  COMMIT                                                                 │
//! │   7. reload order + lines + payment                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error before COMMIT drops the transaction and rolls every write
//! back, including the status change.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::line::{insert_lines, list_lines, reconcile_lines};
use crate::repository::payment::fetch_payment;
use crate::repository::recipe::load_recipe_book;
use crate::repository::stock::apply_plan;
use galley_core::deduction::DeductionPlan;
use galley_core::patch::{LinePlan, NewLine, NewOrder, OrderPatch};
use galley_core::{
    CoreError, DeductionReport, Order, OrderDetail, OrderStatus, StockPolicy, Transition,
};

/// Knobs for [`OrderRepository::apply_update`].
#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions {
    pub stock_policy: StockPolicy,
    /// Upper bound on the deduction batch; exceeding it rolls back the update.
    pub deduction_timeout: Duration,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            stock_policy: StockPolicy::AllowNegative,
            deduction_timeout: Duration::from_secs(5),
        }
    }
}

/// What a committed update did.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// The order as reloaded after commit.
    pub detail: OrderDetail,
    pub previous_status: OrderStatus,
    pub transition: Transition,
    /// Present only when the update moved the order into PAID.
    pub deduction: Option<DeductionReport>,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID (without lines).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id).await
    }

    /// Gets an order with its lines and payment.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<OrderDetail>> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Most recent orders of a branch, newest first.
    pub async fn list_for_branch(&self, branch_id: &str, limit: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT
                id, order_number, company_id, branch_id, waiter_id, status,
                subtotal_cents, discount_cents, rounding_cents, total_cents,
                created_at, updated_at, paid_at
            FROM orders
            WHERE branch_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(branch_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Creates a PENDING order with its lines.
    ///
    /// `lines` come from [`NewOrder::validate`]; `order_number` from the
    /// caller's sequence.
    pub async fn create(
        &self,
        new: &NewOrder,
        lines: &[NewLine],
        order_number: &str,
    ) -> DbResult<OrderDetail> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let (subtotal, total) = new.totals(lines)?;

        debug!(id = %id, order_number = %order_number, branch_id = %new.branch_id, "Creating order");

        let mut tx = begin_write(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, company_id, branch_id, waiter_id, status,
                subtotal_cents, discount_cents, rounding_cents, total_cents,
                created_at, updated_at, paid_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?11, NULL
            )
            "#,
        )
        .bind(&id)
        .bind(order_number)
        .bind(&new.company_id)
        .bind(&new.branch_id)
        .bind(&new.waiter_id)
        .bind(OrderStatus::Pending)
        .bind(subtotal.cents())
        .bind(new.discount_cents)
        .bind(new.rounding_cents)
        .bind(total.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, &id, lines, now).await?;

        let detail = load_detail(&mut tx, &id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", &id))?;
        tx.commit().await?;

        info!(order_id = %id, order_number = %order_number, lines = lines.len(), "Order created");
        Ok(detail)
    }

    /// Deletes an order; lines and payment cascade.
    ///
    /// Returns the deleted order so callers can derive stale cache keys.
    pub async fn delete(&self, id: &str) -> DbResult<Order> {
        let mut tx = begin_write(&self.pool).await?;

        let order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(order_id = %id, "Order deleted");
        Ok(order)
    }

    /// Applies a validated patch in one transaction.
    ///
    /// `lines` is the plan returned by [`OrderPatch::validate`].
    ///
    /// ## Errors
    /// - `NotFound` - order does not exist
    /// - `Rule(InvalidTransition)` - backward move or leaving PAID
    /// - `Rule(OrderLocked)` - line edits on a paid order
    /// - `Rule(OrderLineNotFound)` - unknown line id
    /// - `Rule(InsufficientStock)` - strict policy rejected the batch
    /// - `Rule(QuantityOverflow)` - a deduction does not fit in a quantity
    /// - `Conflict` - the status changed between read and write
    /// - `Busy` - another writer held the lock past `busy_timeout`
    /// - `Timeout` - the deduction batch exceeded its deadline
    pub async fn apply_update(
        &self,
        order_id: &str,
        patch: &OrderPatch,
        lines: &LinePlan,
        options: UpdateOptions,
    ) -> DbResult<UpdateOutcome> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let order = fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        let previous_status = order.status;

        let transition = match patch.status {
            Some(next) => previous_status.check_transition(order_id, next)?,
            None => Transition::Unchanged,
        };
        let next_status = patch.status.unwrap_or(previous_status);

        if previous_status.is_paid() && !lines.is_empty() {
            return Err(CoreError::OrderLocked(order_id.to_string()).into());
        }

        write_order_fields(&mut tx, &order, patch, next_status, transition, now).await?;
        reconcile_lines(&mut tx, order_id, lines, now).await?;

        let deduction = if transition.deducts_inventory() {
            let report = tokio::time::timeout(
                options.deduction_timeout,
                deduct_inventory(&mut tx, &order, options.stock_policy),
            )
            .await
            .map_err(|_| {
                DbError::Timeout(format!(
                    "inventory deduction for order {} exceeded {:?}",
                    order_id, options.deduction_timeout
                ))
            })??;
            Some(report)
        } else {
            None
        };

        tx.commit().await?;

        info!(
            order_id = %order_id,
            from = %previous_status,
            to = %next_status,
            deducted = deduction.is_some(),
            "Order updated"
        );

        let mut conn = self.pool.acquire().await?;
        let detail = load_detail(&mut conn, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;

        Ok(UpdateOutcome {
            detail,
            previous_status,
            transition,
            deduction,
        })
    }
}

// =============================================================================
// Transaction-Level Operations
// =============================================================================

pub(crate) async fn fetch_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        SELECT
            id, order_number, company_id, branch_id, waiter_id, status,
            subtotal_cents, discount_cents, rounding_cents, total_cents,
            created_at, updated_at, paid_at
        FROM orders
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

pub(crate) async fn load_detail(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<OrderDetail>> {
    let Some(order) = fetch_order(conn, id).await? else {
        return Ok(None);
    };
    let lines = list_lines(conn, id).await?;
    let payment = fetch_payment(conn, id).await?;

    Ok(Some(OrderDetail {
        order,
        lines,
        payment,
    }))
}

/// Overwrites supplied money fields and the status, guarded by the status
/// that was read at the start of the transaction.
async fn write_order_fields(
    conn: &mut SqliteConnection,
    order: &Order,
    patch: &OrderPatch,
    next_status: OrderStatus,
    transition: Transition,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let paid_at = transition.deducts_inventory().then_some(now);

    let result = sqlx::query(
        r#"
        UPDATE orders SET
            subtotal_cents = COALESCE(?3, subtotal_cents),
            discount_cents = COALESCE(?4, discount_cents),
            rounding_cents = COALESCE(?5, rounding_cents),
            total_cents = COALESCE(?6, total_cents),
            status = ?7,
            paid_at = COALESCE(paid_at, ?8),
            updated_at = ?9
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(&order.id)
    .bind(order.status)
    .bind(patch.subtotal_cents)
    .bind(patch.discount_cents)
    .bind(patch.rounding_cents)
    .bind(patch.total_cents)
    .bind(next_status)
    .bind(paid_at)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Conflict(format!(
            "order {} is no longer {}",
            order.id, order.status
        )));
    }
    Ok(())
}

async fn deduct_inventory(
    conn: &mut SqliteConnection,
    order: &Order,
    policy: StockPolicy,
) -> DbResult<DeductionReport> {
    let lines = list_lines(conn, &order.id).await?;

    let mut menu_items: Vec<&str> = lines.iter().map(|l| l.menu_item_id.as_str()).collect();
    menu_items.sort_unstable();
    menu_items.dedup();

    let book = load_recipe_book(conn, &menu_items).await?;
    let plan = DeductionPlan::build(&order.branch_id, &lines, &book)?;

    debug!(
        order_id = %order.id,
        branch_id = %order.branch_id,
        menu_items = menu_items.len(),
        ingredients = plan.len(),
        "Deduction plan built"
    );

    apply_plan(conn, &plan, policy).await
}

// =============================================================================
// Tests
// =============================================================================
