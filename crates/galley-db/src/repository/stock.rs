//! # Stock Ledger
//!
//! Per-(ingredient, branch) quantity counters.
//!
//! ## Creation vs Decrement Asymmetry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add(bun, B, 10)     no row? ──► INSERT (bun, B, 10.000)                │
//! │                      row?    ──► quantity += 10.000                      │
//! │                                                                         │
//! │  apply_plan(...)     no row? ──► skipped (nothing inserted, no error)   │
//! │                      row?    ──► quantity -= delta                       │
//! │                                  below zero:                            │
//! │                                    AllowNegative → write + shortage     │
//! │                                    Strict        → InsufficientStock    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A deduction batch runs inside the caller's transaction so the whole
//! batch commits or rolls back with the order update.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use galley_core::deduction::DeductionPlan;
use galley_core::validation::{validate_id, validate_stock_addition};
use galley_core::{CoreError, DeductionReport, Quantity, StockChange, StockKey, StockPolicy, StockRecord};

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Adds stock, creating the record on first addition.
    ///
    /// ## Errors
    /// - `Rule(Validation)` if `quantity` is not positive
    /// - `NotFound` if the ingredient does not exist
    pub async fn add(
        &self,
        ingredient_id: &str,
        branch_id: &str,
        quantity: Quantity,
    ) -> DbResult<StockRecord> {
        validate_id("ingredientId", ingredient_id)?;
        validate_id("branchId", branch_id)?;
        validate_stock_addition(quantity)?;

        let record = sqlx::query_as::<_, StockRecord>(
            r#"
            INSERT INTO stock_records (ingredient_id, branch_id, quantity_milli, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (ingredient_id, branch_id) DO UPDATE SET
                quantity_milli = quantity_milli + excluded.quantity_milli,
                updated_at = excluded.updated_at
            RETURNING ingredient_id, branch_id, quantity_milli AS quantity, updated_at
            "#,
        )
        .bind(ingredient_id)
        .bind(branch_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Ingredient", ingredient_id),
            other => other,
        })?;

        info!(
            ingredient_id = %ingredient_id,
            branch_id = %branch_id,
            added = %quantity,
            quantity = %record.quantity,
            "Stock added"
        );
        Ok(record)
    }

    pub async fn get(&self, key: &StockKey) -> DbResult<Option<StockRecord>> {
        let mut conn = self.pool.acquire().await?;
        fetch_record(&mut conn, key).await
    }

    /// All records of a branch, by ingredient id.
    pub async fn list_for_branch(&self, branch_id: &str) -> DbResult<Vec<StockRecord>> {
        let records = sqlx::query_as::<_, StockRecord>(
            r#"
            SELECT ingredient_id, branch_id, quantity_milli AS quantity, updated_at
            FROM stock_records
            WHERE branch_id = ?1
            ORDER BY ingredient_id
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Applies a deduction plan as its own atomic batch.
    pub async fn apply_deductions(
        &self,
        plan: &DeductionPlan,
        policy: StockPolicy,
    ) -> DbResult<DeductionReport> {
        let mut tx = begin_write(&self.pool).await?;
        let report = apply_plan(&mut tx, plan, policy).await?;
        tx.commit().await?;
        Ok(report)
    }
}

async fn fetch_record(conn: &mut SqliteConnection, key: &StockKey) -> DbResult<Option<StockRecord>> {
    let record = sqlx::query_as::<_, StockRecord>(
        r#"
        SELECT ingredient_id, branch_id, quantity_milli AS quantity, updated_at
        FROM stock_records
        WHERE ingredient_id = ?1 AND branch_id = ?2
        "#,
    )
    .bind(&key.ingredient_id)
    .bind(&key.branch_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(record)
}

/// Decrements every entry of `plan` within the caller's transaction.
pub(crate) async fn apply_plan(
    conn: &mut SqliteConnection,
    plan: &DeductionPlan,
    policy: StockPolicy,
) -> DbResult<DeductionReport> {
    let now = Utc::now();
    let mut report = DeductionReport::default();

    for (key, delta) in plan.iter() {
        let Some(record) = fetch_record(conn, key).await? else {
            debug!(stock = %key, "No stock record; decrement skipped");
            report.skipped.push(key.clone());
            continue;
        };

        let remaining =
            record
                .quantity
                .checked_sub(delta)
                .ok_or_else(|| CoreError::QuantityOverflow {
                    ingredient_id: key.ingredient_id.clone(),
                    branch_id: key.branch_id.clone(),
                })?;
        if remaining.is_negative() && policy == StockPolicy::Strict {
            return Err(CoreError::InsufficientStock {
                ingredient_id: key.ingredient_id.clone(),
                branch_id: key.branch_id.clone(),
                available: record.quantity,
                requested: delta,
            }
            .into());
        }

        sqlx::query(
            r#"
            UPDATE stock_records SET
                quantity_milli = quantity_milli - ?3,
                updated_at = ?4
            WHERE ingredient_id = ?1 AND branch_id = ?2
            "#,
        )
        .bind(&key.ingredient_id)
        .bind(&key.branch_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let change = StockChange {
            key: key.clone(),
            deducted: delta,
            remaining,
        };
        if remaining.is_negative() {
            warn!(stock = %key, remaining = %remaining, "Stock went negative");
            report.shortages.push(change.clone());
        }
        report.applied.push(change);
    }

    debug!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        shortages = report.shortages.len(),
        "Deduction batch applied"
    );
    Ok(report)
}
