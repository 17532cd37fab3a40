//! # Order Repository
//!
//! Checkout persistence, cancellation, and the period queries behind the
//! sales summary.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction)                                         │
//! │     └── upsert customer by phone                                       │
//! │     └── insert order { status: Active, items_json as submitted }       │
//! │     └── insert initial payment (if any)                                │
//! │                                                                         │
//! │  2. INSTALLMENTS                                                       │
//! │     └── PaymentRepository::add() while Active                          │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                  │
//! │     └── cancel() → { status: Cancelled }, no further payments          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line items are stored verbatim; they are only interpreted (leniently)
//! when an [`Order`] is built for reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::customer::{upsert_by_phone, NewCustomer};
use crate::repository::payment::insert_payment;
use clinic_core::{coerce, CoreError, Money, Order, OrderStatus, PaymentMethod};

/// An order as submitted at checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub sale_staff_id: i64,
    /// Staff member operating the checkout.
    pub created_by: Option<i64>,
    /// Line items exactly as the checkout screen sent them.
    pub items: Value,
    pub total_price: Money,
    pub image_url: Option<String>,
    pub initial_payment: Option<InitialPayment>,
}

/// Payment taken at checkout.
#[derive(Debug, Clone, Copy)]
pub struct InitialPayment {
    pub amount: Money,
    pub method: PaymentMethod,
}

/// Ids produced by a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedOrder {
    pub order_id: i64,
    pub customer_id: i64,
    pub payment_id: Option<i64>,
}

/// An order as shown in customer history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: i64,
    pub customer_id: i64,
    pub sale_staff_id: i64,
    pub sale_staff_name: Option<String>,
    /// Stored line items; unparsable text is returned as a JSON string.
    pub items: Value,
    pub total_price: Money,
    pub image_url: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderRow {
    id: i64,
    customer_id: i64,
    sale_staff_id: i64,
    sale_staff_name: Option<String>,
    items_json: String,
    total_price: Money,
    image_url: Option<String>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    pub(crate) fn into_record(self) -> OrderRecord {
        let items = serde_json::from_str(&self.items_json)
            .unwrap_or_else(|_| Value::String(self.items_json.clone()));

        OrderRecord {
            id: self.id,
            customer_id: self.customer_id,
            sale_staff_id: self.sale_staff_id,
            sale_staff_name: self.sale_staff_name,
            items,
            total_price: self.total_price,
            image_url: self.image_url,
            status: self.status,
            created_at: self.created_at,
        }
    }

    fn into_order(self) -> Order {
        Order {
            id: self.id,
            staff_id: self.sale_staff_id,
            lines: coerce::order_lines_from_str(&self.items_json),
            total_price: self.total_price,
            created_at: self.created_at,
            status: self.status,
        }
    }
}

const ORDER_COLUMNS: &str = r#"
    o.id, o.customer_id, o.sale_staff_id, u.display_name AS sale_staff_name,
    o.items_json, o.total_price, o.image_url, o.status, o.created_at
"#;

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

    /// Records a checkout: customer upsert, order and initial payment.
    ///
    /// All three writes commit together or not at all.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - unknown sale staff or operator id
    pub async fn create(&self, customer: &NewCustomer, order: &NewOrder) -> DbResult<CreatedOrder> {
        let now = Utc::now();
        let items_json = serde_json::to_string(&order.items)
            .map_err(|e| DbError::Internal(format!("Failed to encode items: {}", e)))?;

        let mut tx = self.pool.begin().await?;

        let customer_id = upsert_by_phone(&mut *tx, customer).await?;

        debug!(customer_id, sale_staff_id = order.sale_staff_id, total = %order.total_price, "Inserting order");
        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                customer_id, sale_staff_id, created_by, items_json,
                total_price, image_url, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id
            "#,
        )
        .bind(customer_id)
        .bind(order.sale_staff_id)
        .bind(order.created_by)
        .bind(&items_json)
        .bind(order.total_price)
        .bind(&order.image_url)
        .bind(OrderStatus::Active)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let payment_id = match order.initial_payment {
            Some(payment) if payment.amount.is_positive() => Some(
                insert_payment(
                    &mut *tx,
                    order_id,
                    payment.amount,
                    payment.method,
                    order.created_by,
                    order.image_url.as_deref(),
                    now,
                )
                .await?,
            ),
            _ => None,
        };

        tx.commit().await?;

        Ok(CreatedOrder {
            order_id,
            customer_id,
            payment_id,
        })
    }

    /// Gets an order by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<OrderRecord>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders o LEFT JOIN users u ON u.id = o.sale_staff_id WHERE o.id = ?1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OrderRow::into_record))
    }

    /// Cancels an active order.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such order
    /// * `DbError::Domain(InvalidOrderStatus)` - already cancelled
    pub async fn cancel(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let status: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        match status {
            None => return Err(DbError::not_found("Order", id)),
            Some(OrderStatus::Cancelled) => {
                return Err(CoreError::InvalidOrderStatus {
                    order_id: id,
                    current_status: "Cancelled".to_string(),
                }
                .into())
            }
            Some(OrderStatus::Active) => {}
        }

        debug!(id, "Cancelling order");
        sqlx::query("UPDATE orders SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(OrderStatus::Cancelled)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Active orders created in `[from, until)`, for the sales summary.
    pub async fn list_for_period(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {}
            FROM orders o
            LEFT JOIN users u ON u.id = o.sale_staff_id
            WHERE o.status = 'Active' AND o.created_at >= ?1 AND o.created_at < ?2
            ORDER BY o.created_at ASC, o.id ASC
            "#,
            ORDER_COLUMNS
        ))
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderRow::into_order).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
