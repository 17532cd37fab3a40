//! # Commission Tier Repository
//!
//! The configured commission brackets. Saving replaces the whole table in
//! one transaction, so readers see either the old set or the new one.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use clinic_core::CommissionTier;

/// Repository for commission tiers.
#[derive(Debug, Clone)]
pub struct CommissionTierRepository {
    pool: SqlitePool,
}

impl CommissionTierRepository {
    /// Creates a new CommissionTierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CommissionTierRepository { pool }
    }

    /// All tiers by ascending minimum sales.
    pub async fn list(&self) -> DbResult<Vec<CommissionTier>> {
        let tiers = sqlx::query_as::<_, CommissionTier>(
            r#"
            SELECT id, min_sales, max_sales, percent
            FROM commission_tiers
            ORDER BY min_sales ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tiers)
    }

    /// Replaces every tier with `tiers`. Incoming ids are ignored.
    pub async fn replace_all(&self, tiers: &[CommissionTier]) -> DbResult<Vec<CommissionTier>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM commission_tiers")
            .execute(&mut *tx)
            .await?;

        for tier in tiers {
            sqlx::query(
                "INSERT INTO commission_tiers (min_sales, max_sales, percent) VALUES (?1, ?2, ?3)",
            )
            .bind(tier.min_sales)
            .bind(tier.max_sales)
            .bind(tier.percent)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(count = tiers.len(), "Commission tiers replaced");

        self.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use clinic_core::types::Rate;
    use clinic_core::Money;

    fn tier(min: i64, max: Option<i64>, percent: u32) -> CommissionTier {
        CommissionTier {
            id: 0,
            min_sales: Money::from_major(min),
            max_sales: max.map(Money::from_major),
            percent: Rate::from_percent(percent),
        }
    }

    #[tokio::test]
    async fn test_replace_all_orders_by_min_sales() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.commission_tiers().list().await.unwrap().is_empty());

        let saved = db
            .commission_tiers()
            .replace_all(&[tier(50_000, None, 10), tier(0, Some(49_999), 5)])
            .await
            .unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].min_sales, Money::from_major(0));
        assert_eq!(saved[0].max_sales, Some(Money::from_major(49_999)));
        assert_eq!(saved[1].percent, Rate::from_percent(10));
        assert_eq!(saved[1].max_sales, None);
    }

    #[tokio::test]
    async fn test_replace_all_discards_previous_set() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.commission_tiers()
            .replace_all(&[tier(0, None, 3), tier(1000, None, 4)])
            .await
            .unwrap();

        let saved = db.commission_tiers().replace_all(&[tier(0, None, 7)]).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].percent, Rate::from_percent(7));

        assert!(db.commission_tiers().replace_all(&[]).await.unwrap().is_empty());
    }
}
