//! # Order Line Repository
//!
//! Reconciles submitted lines against the persisted lines of an order.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LinePlan { updates, inserts }                                          │
//! │       │                                                                 │
//! │       ├── 1. check_against(persisted ids)  ── unknown id? ──► abort    │
//! │       │                                                                 │
//! │       ├── 2. UPDATE order_lines ... WHERE id = ? AND order_id = ?      │
//! │       │        (quantity, unit price, line total)                      │
//! │       │                                                                 │
//! │       └── 3. INSERT new rows with fresh UUIDs                          │
//! │                                                                         │
//! │  All three steps share the caller's transaction.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::order::fetch_order;
use galley_core::patch::{LinePlan, NewLine};
use galley_core::{CoreError, OrderLine};

/// Repository for order line operations outside a full order update.
#[derive(Debug, Clone)]
pub struct LineRepository {
    pool: SqlitePool,
}

impl LineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LineRepository { pool }
    }

    /// Lines of an order in creation order.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let mut conn = self.pool.acquire().await?;
        list_lines(&mut conn, order_id).await
    }

    /// Reconciles `plan` against the order's lines in one transaction.
    ///
    /// Returns the merged, persisted set of lines.
    ///
    /// ## Errors
    /// - `NotFound` if the order does not exist
    /// - `Rule(OrderLocked)` if the order is paid
    /// - `Rule(OrderLineNotFound)` if any update id is unknown (nothing written)
    pub async fn reconcile(&self, order_id: &str, plan: &LinePlan) -> DbResult<Vec<OrderLine>> {
        let mut tx = begin_write(&self.pool).await?;

        let order = fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        if order.status.is_paid() && !plan.is_empty() {
            return Err(CoreError::OrderLocked(order_id.to_string()).into());
        }

        reconcile_lines(&mut tx, order_id, plan, Utc::now()).await?;
        let lines = list_lines(&mut tx, order_id).await?;
        tx.commit().await?;

        Ok(lines)
    }
}

// =============================================================================
// Transaction-Level Operations
// =============================================================================

pub(crate) async fn list_lines(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>(
        r#"
        SELECT
            id, order_id, menu_item_id, quantity,
            unit_price_cents, line_total_cents,
            created_at, updated_at
        FROM order_lines
        WHERE order_id = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

pub(crate) async fn insert_lines(
    conn: &mut SqliteConnection,
    order_id: &str,
    lines: &[NewLine],
    now: DateTime<Utc>,
) -> DbResult<()> {
    for line in lines {
        let id = Uuid::new_v4().to_string();
        debug!(order_id = %order_id, line_id = %id, menu_item_id = %line.menu_item_id, "Inserting order line");

        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, menu_item_id, quantity,
                unit_price_cents, line_total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&id)
        .bind(order_id)
        .bind(&line.menu_item_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.line_total_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Applies a line plan all-or-nothing within the caller's transaction.
pub(crate) async fn reconcile_lines(
    conn: &mut SqliteConnection,
    order_id: &str,
    plan: &LinePlan,
    now: DateTime<Utc>,
) -> DbResult<()> {
    if plan.is_empty() {
        return Ok(());
    }

    if !plan.updates.is_empty() {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM order_lines WHERE order_id = ?1")
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;
        plan.check_against(order_id, ids.iter().map(String::as_str))?;
    }

    for update in &plan.updates {
        let result = sqlx::query(
            r#"
            UPDATE order_lines SET
                quantity = ?3,
                unit_price_cents = ?4,
                line_total_cents = ?5,
                updated_at = ?6
            WHERE id = ?1 AND order_id = ?2
            "#,
        )
        .bind(&update.id)
        .bind(order_id)
        .bind(update.quantity)
        .bind(update.unit_price_cents)
        .bind(update.line_total_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::OrderLineNotFound {
                order_id: order_id.to_string(),
                line_id: update.id.clone(),
            }
            .into());
        }
    }

    insert_lines(conn, order_id, &plan.inserts, now).await?;

    debug!(
        order_id = %order_id,
        updated = plan.updates.len(),
        inserted = plan.inserts.len(),
        "Order lines reconciled"
    );
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
