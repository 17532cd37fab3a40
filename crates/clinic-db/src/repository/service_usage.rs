//! # Service Usage Repository
//!
//! Treatment sessions consumed by a customer, optionally against an order
//! (e.g. session 3 of a 10-session package).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use clinic_core::{CoreError, ValidationError};

/// A session to record.
#[derive(Debug, Clone)]
pub struct NewServiceUsage {
    pub customer_id: i64,
    pub order_id: Option<i64>,
    pub usage_date: NaiveDate,
    pub details: String,
    pub doctor_id: Option<i64>,
}

/// A recorded session, with the doctor's display name.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUsageRecord {
    pub id: i64,
    pub customer_id: i64,
    pub order_id: Option<i64>,
    pub usage_date: NaiveDate,
    pub details: String,
    pub doctor_id: Option<i64>,
    pub doctor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Repository for service usage records.
#[derive(Debug, Clone)]
pub struct ServiceUsageRepository {
    pool: SqlitePool,
}

impl ServiceUsageRepository {
    /// Creates a new ServiceUsageRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceUsageRepository { pool }
    }

    /// Records a session.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - unknown customer or order
    /// * `DbError::Domain` - the order belongs to a different customer
    pub async fn record(&self, usage: &NewServiceUsage) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let customer: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?1")
            .bind(usage.customer_id)
            .fetch_optional(&mut *tx)
            .await?;
        if customer.is_none() {
            return Err(DbError::not_found("Customer", usage.customer_id));
        }

        if let Some(order_id) = usage.order_id {
            let owner: Option<i64> = sqlx::query_scalar("SELECT customer_id FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;

            match owner {
                None => return Err(DbError::not_found("Order", order_id)),
                Some(owner) if owner != usage.customer_id => {
                    return Err(CoreError::from(ValidationError::InvalidFormat {
                        field: "orderId".to_string(),
                        reason: "belongs to another customer".to_string(),
                    })
                    .into())
                }
                Some(_) => {}
            }
        }

        debug!(customer_id = usage.customer_id, order_id = ?usage.order_id, "Recording service usage");
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO service_usage (customer_id, order_id, usage_date, details, doctor_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id
            "#,
        )
        .bind(usage.customer_id)
        .bind(usage.order_id)
        .bind(usage.usage_date)
        .bind(&usage.details)
        .bind(usage.doctor_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// A customer's sessions, most recent first.
    pub async fn list_for_customer(&self, customer_id: i64) -> DbResult<Vec<ServiceUsageRecord>> {
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
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(usage)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
