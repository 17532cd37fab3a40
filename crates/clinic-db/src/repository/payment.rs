//! # Payment Repository
//!
//! Append-only payments against orders (installments / debt model).
//!
//! Payments are never updated or deleted. A payment is accepted only while
//! its order is `Active`; the status check and the insert share one
//! transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use clinic_core::{CoreError, Money, OrderStatus, Payment, PaymentMethod};

/// An installment payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub amount: Money,
    pub method: PaymentMethod,
    /// Staff member who took the money.
    pub received_by: Option<i64>,
    /// Slip or receipt photo.
    pub image_url: Option<String>,
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a payment against an active order.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such order
    /// * `DbError::Domain(InvalidOrderStatus)` - the order is cancelled
    pub async fn add(&self, payment: &NewPayment) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let status: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
            .bind(payment.order_id)
            .fetch_optional(&mut *tx)
            .await?;

        match status {
            None => return Err(DbError::not_found("Order", payment.order_id)),
            Some(OrderStatus::Cancelled) => {
                return Err(CoreError::InvalidOrderStatus {
                    order_id: payment.order_id,
                    current_status: "Cancelled".to_string(),
                }
                .into())
            }
            Some(OrderStatus::Active) => {}
        }

        let id = insert_payment(
            &mut *tx,
            payment.order_id,
            payment.amount,
            payment.method,
            payment.received_by,
            payment.image_url.as_deref(),
            Utc::now(),
        )
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Payments made in `[from, until)` whose order is active and was also
    /// created in `[from, until)`.
    pub async fn list_for_period(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.id, p.order_id, p.amount, p.method, p.created_at
            FROM payments p
            JOIN orders o ON o.id = p.order_id
            WHERE p.created_at >= ?1 AND p.created_at < ?2
              AND o.created_at >= ?1 AND o.created_at < ?2
              AND o.status = 'Active'
            ORDER BY p.created_at ASC, p.id ASC
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// All payments for one order, oldest first.
    pub async fn list_for_order(&self, order_id: i64) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, order_id, amount, method, created_at
            FROM payments
            WHERE order_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Gets total amount paid for an order.
    pub async fn total_paid(&self, order_id: i64) -> DbResult<Money> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE order_id = ?1")
                .bind(order_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Money::from_cents(total))
    }
}

/// Inserts one payment row inside the caller's transaction.
pub(crate) async fn insert_payment(
    conn: &mut SqliteConnection,
    order_id: i64,
    amount: Money,
    method: PaymentMethod,
    received_by: Option<i64>,
    image_url: Option<&str>,
    created_at: DateTime<Utc>,
) -> DbResult<i64> {
    debug!(order_id, amount = %amount, method = ?method, "Recording payment");

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO payments (order_id, amount, method, received_by, image_url, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING id
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .bind(method)
    .bind(received_by)
    .bind(image_url)
    .bind(created_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================
