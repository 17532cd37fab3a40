//! # Customer Repository
//!
//! Customer lookup, phone-keyed upsert, and the full customer history view.
//!
//! ## Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A customer is identified by phone number (UNIQUE).                    │
//! │                                                                         │
//! │  save_order        ──► upsert_by_phone    (refreshes the profile)      │
//! │  save_appointment  ──► find_or_create     (keeps an existing profile)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::order::{OrderRecord, OrderRow};
use crate::repository::service_usage::ServiceUsageRecord;
use clinic_core::{Customer, Money, Payment};

/// Customer profile as submitted at checkout.
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub age: Option<i64>,
    pub disease: Option<String>,
    pub pdpa_consent: bool,
}

/// Everything known about one customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    pub customer: Customer,
    /// Newest first, cancelled orders included.
    pub orders: Vec<OrderRecord>,
    /// Newest first.
    pub payments: Vec<Payment>,
    pub usage: Vec<ServiceUsageRecord>,
    /// Open balance: non-cancelled order totals less their payments.
    pub total_debt: Money,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, first_name, last_name, phone, age, disease, pdpa_consent, created_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by exact phone number.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, first_name, last_name, phone, age, disease, pdpa_consent, created_at
            FROM customers
            WHERE phone = ?1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Searches customers by name or phone substring.
    ///
    /// ## Search Strategy
    /// - Case-insensitive `LIKE` on first name, last name, full name, phone
    /// - `%` and `_` in the query match literally
    /// - Empty query lists everyone
    /// - Ordered by first name, capped at `limit`
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Customer>> {
        let pattern = like_pattern(query);
        debug!(query = %query, limit, "Searching customers");

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, first_name, last_name, phone, age, disease, pdpa_consent, created_at
            FROM customers
            WHERE first_name LIKE ?1 ESCAPE '\'
               OR last_name LIKE ?1 ESCAPE '\'
               OR (first_name || ' ' || last_name) LIKE ?1 ESCAPE '\'
               OR phone LIKE ?1 ESCAPE '\'
            ORDER BY first_name ASC, id ASC
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Profile, orders, payments, service usage and open balance.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such customer
    pub async fn full_detail(&self, id: i64) -> DbResult<CustomerDetail> {
        let customer = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        let orders = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT o.id, o.customer_id, o.sale_staff_id, u.display_name AS sale_staff_name,
                   o.items_json, o.total_price, o.image_url, o.status, o.created_at
            FROM orders o
            LEFT JOIN users u ON u.id = o.sale_staff_id
            WHERE o.customer_id = ?1
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(OrderRow::into_record)
        .collect();

        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.id, p.order_id, p.amount, p.method, p.created_at
            FROM payments p
            JOIN orders o ON o.id = p.order_id
            WHERE o.customer_id = ?1
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let usage = sqlx::query_as::<_, ServiceUsageRecord>(
            r#"
            SELECT su.id, su.customer_id, su.order_id, su.usage_date, su.details,
                   su.doctor_id, dr.display_name AS doctor_name, su.created_at
            FROM service_usage su
            LEFT JOIN users dr ON dr.id = su.doctor_id
            WHERE su.customer_id = ?1
            ORDER BY su.usage_date DESC, su.id DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let (ordered, paid): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COALESCE(SUM(total_price), 0)
                 FROM orders
                 WHERE customer_id = ?1 AND status != 'Cancelled'),
                (SELECT COALESCE(SUM(p.amount), 0)
                 FROM payments p
                 JOIN orders o ON o.id = p.order_id
                 WHERE o.customer_id = ?1 AND o.status != 'Cancelled')
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CustomerDetail {
            customer,
            orders,
            payments,
            usage,
            total_debt: Money::from_cents(ordered - paid),
        })
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Inserts the customer, or refreshes the profile of the one with this phone.
pub(crate) async fn upsert_by_phone(conn: &mut SqliteConnection, customer: &NewCustomer) -> DbResult<i64> {
    debug!(phone = %customer.phone, "Upserting customer");

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO customers (first_name, last_name, phone, age, disease, pdpa_consent, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(phone) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            age = excluded.age,
            disease = excluded.disease,
            pdpa_consent = excluded.pdpa_consent
        RETURNING id
        "#,
    )
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.phone)
    .bind(customer.age)
    .bind(&customer.disease)
    .bind(customer.pdpa_consent)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Returns the customer with this phone, creating a bare profile if needed.
pub(crate) async fn find_or_create_by_phone(
    conn: &mut SqliteConnection,
    first_name: &str,
    last_name: &str,
    phone: &str,
) -> DbResult<i64> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE phone = ?1")
        .bind(phone)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    debug!(phone = %phone, "Creating customer from appointment");
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO customers (first_name, last_name, phone, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(first_name)
    .bind(last_name)
    .bind(phone)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// `%query%` with LIKE wildcards in the query escaped.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn somchai() -> NewCustomer {
        NewCustomer {
            first_name: "Somchai".into(),
            last_name: "Jaidee".into(),
            phone: "0812345678".into(),
            age: Some(41),
            disease: None,
            pdpa_consent: true,
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" som "), "%som%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[tokio::test]
    async fn test_upsert_by_phone_refreshes_profile() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = upsert_by_phone(&mut conn, &somchai()).await.unwrap();
        let updated = NewCustomer {
            age: Some(42),
            disease: Some("Diabetes".into()),
            ..somchai()
        };
        let second = upsert_by_phone(&mut conn, &updated).await.unwrap();
        drop(conn);

        assert_eq!(first, second);
        let customer = db.customers().get(first).await.unwrap().unwrap();
        assert_eq!(customer.age, Some(42));
        assert_eq!(customer.disease.as_deref(), Some("Diabetes"));
        assert!(customer.pdpa_consent);
    }

    #[tokio::test]
    async fn test_find_or_create_keeps_existing_profile() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let id = upsert_by_phone(&mut conn, &somchai()).await.unwrap();
        let same = find_or_create_by_phone(&mut conn, "Other", "Name", "0812345678")
            .await
            .unwrap();
        let new = find_or_create_by_phone(&mut conn, "Malee", "Suk", "0899999999")
            .await
            .unwrap();
        drop(conn);

        assert_eq!(id, same);
        assert_ne!(id, new);
        let customer = db.customers().get(id).await.unwrap().unwrap();
        assert_eq!(customer.first_name, "Somchai");
        let created = db.customers().get_by_phone("0899999999").await.unwrap().unwrap();
        assert_eq!(created.full_name(), "Malee Suk");
        assert!(!created.pdpa_consent);
    }

    #[tokio::test]
    async fn test_search() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        upsert_by_phone(&mut conn, &somchai()).await.unwrap();
        upsert_by_phone(
            &mut conn,
            &NewCustomer {
                first_name: "Anong".into(),
                last_name: "Somsri".into(),
                phone: "0900000001".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        drop(conn);

        let found = db.customers().search("SOM", 50).await.unwrap();
        let names: Vec<&str> = found.iter().map(|c| c.first_name.as_str()).collect();
        assert_eq!(names, vec!["Anong", "Somchai"]);

        assert_eq!(db.customers().search("chai jai", 50).await.unwrap().len(), 1);
        assert_eq!(db.customers().search("0812", 50).await.unwrap().len(), 1);
        assert_eq!(db.customers().search("", 50).await.unwrap().len(), 2);
        assert_eq!(db.customers().search("", 1).await.unwrap().len(), 1);
        assert!(db.customers().search("%", 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_detail_missing_customer() {
        let db = db().await;
        assert!(matches!(
            db.customers().full_detail(77).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
