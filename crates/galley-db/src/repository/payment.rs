//! # Payment Repository
//!
//! At most one payment per order. Recording a payment never changes the
//! order's status; settling is a separate PAID transition.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::order::fetch_order;
use galley_core::validation::{validate_payment_amount, validate_payment_reference};
use galley_core::{Payment, PaymentMethod};

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Attaches a payment to an order.
    ///
    /// ## Errors
    /// - `NotFound` if the order does not exist
    /// - `Conflict` if the order already has a payment
    pub async fn record(
        &self,
        order_id: &str,
        method: PaymentMethod,
        amount_cents: i64,
        reference: Option<&str>,
    ) -> DbResult<Payment> {
        validate_payment_amount(amount_cents)?;
        validate_payment_reference(reference)?;

        let mut tx = begin_write(&self.pool).await?;
        if fetch_order(&mut tx, order_id).await?.is_none() {
            return Err(DbError::not_found("Order", order_id));
        }

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            method,
            amount_cents,
            reference: reference.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(order_id = %order_id, amount = amount_cents, "Recording payment");

        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, method, amount_cents, reference, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.method)
        .bind(payment.amount_cents)
        .bind(&payment.reference)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::Conflict(format!("order {} already has a payment", order_id))
            }
            other => other,
        })?;

        tx.commit().await?;
        Ok(payment)
    }

    pub async fn get_for_order(&self, order_id: &str) -> DbResult<Option<Payment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payment(&mut conn, order_id).await
    }
}

pub(crate) async fn fetch_payment(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, order_id, method, amount_cents, reference, created_at
        FROM payments
        WHERE order_id = ?1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{burger_order, test_db};
    use galley_core::OrderStatus;

    #[tokio::test]
    async fn test_payment_attached_to_reloaded_order() {
        let db = test_db().await;
        let order = burger_order(&db, "B").await;

        let payment = db
            .payments()
            .record(&order.order.id, PaymentMethod::Card, 2_897, Some("AUTH-991"))
            .await
            .unwrap();

        let detail = db.orders().get_detail(&order.order.id).await.unwrap().unwrap();
        assert_eq!(detail.payment, Some(payment));
        assert_eq!(detail.order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_second_payment_conflicts() {
        let db = test_db().await;
        let order = burger_order(&db, "B").await;
        let payments = db.payments();

        payments
            .record(&order.order.id, PaymentMethod::Cash, 1_000, None)
            .await
            .unwrap();
        let err = payments
            .record(&order.order.id, PaymentMethod::Cash, 1_000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_payment_validation_and_missing_order() {
        let db = test_db().await;
        assert!(matches!(
            db.payments().record("ghost", PaymentMethod::Cash, 100, None).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.payments().record("ghost", PaymentMethod::Cash, 0, None).await,
            Err(DbError::Rule(_))
        ));
    }
}
