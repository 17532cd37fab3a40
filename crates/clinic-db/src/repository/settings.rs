//! # Settings Repository
//!
//! The single `system_settings` row (id = 1): chat bot alert target and
//! the card processing fee.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use clinic_core::SystemSettings;

/// Repository for the settings row.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads the settings. A missing row reads as defaults.
    pub async fn get(&self) -> DbResult<SystemSettings> {
        let settings = sqlx::query_as::<_, SystemSettings>(
            r#"
            SELECT tg_token, tg_chat_id, alert_new_order, card_fee_percent
            FROM system_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings.unwrap_or_else(|| {
            warn!("Settings row missing, using defaults");
            SystemSettings::default()
        }))
    }

    /// Replaces the settings row.
    pub async fn save(&self, settings: &SystemSettings) -> DbResult<()> {
        debug!(
            alert_new_order = settings.alert_new_order,
            card_fee = %settings.card_fee_percent,
            "Saving settings"
        );

        sqlx::query(
            r#"
            INSERT INTO system_settings (id, tg_token, tg_chat_id, alert_new_order, card_fee_percent)
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                tg_token = excluded.tg_token,
                tg_chat_id = excluded.tg_chat_id,
                alert_new_order = excluded.alert_new_order,
                card_fee_percent = excluded.card_fee_percent
            "#,
        )
        .bind(&settings.tg_token)
        .bind(&settings.tg_chat_id)
        .bind(settings.alert_new_order)
        .bind(settings.card_fee_percent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
