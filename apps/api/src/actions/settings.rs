//! # Settings Actions
//!
//! Chat alert settings, the card fee and the commission schedule.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::decode;
use crate::error::ApiResult;
use crate::AppState;
use clinic_core::types::Rate;
use clinic_core::validation::{validate_commission_tiers, validate_rate};
use clinic_core::CommissionTier;

/// Partial settings update; absent fields keep their stored value and an
/// empty token or chat id clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsPatch {
    #[serde(default, alias = "tg_token")]
    tg_token: Option<String>,
    #[serde(default, alias = "tg_chat_id")]
    tg_chat_id: Option<String>,
    #[serde(default, alias = "alert_new_order")]
    alert_new_order: Option<bool>,
    #[serde(default, alias = "card_fee_percent")]
    card_fee_percent: Option<Rate>,
}

#[derive(Debug, Deserialize)]
struct TiersPayload {
    tiers: Vec<CommissionTier>,
}

fn cleared_if_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub async fn get_settings(state: &AppState) -> ApiResult<Value> {
    let settings = state.db.settings().get().await?;
    Ok(json!({ "settings": settings }))
}

pub async fn save_settings(state: &AppState, payload: Value) -> ApiResult<Value> {
    let patch: SettingsPatch = decode(payload)?;
    if let Some(fee) = patch.card_fee_percent {
        validate_rate("cardFeePercent", fee)?;
    }

    let mut settings = state.db.settings().get().await?;
    if let Some(token) = patch.tg_token {
        settings.tg_token = cleared_if_empty(token);
    }
    if let Some(chat_id) = patch.tg_chat_id {
        settings.tg_chat_id = cleared_if_empty(chat_id);
    }
    if let Some(alert) = patch.alert_new_order {
        settings.alert_new_order = alert;
    }
    if let Some(fee) = patch.card_fee_percent {
        settings.card_fee_percent = fee;
    }

    state.db.settings().save(&settings).await?;
    info!(alert_new_order = settings.alert_new_order, "Settings saved");
    Ok(json!({ "settings": settings }))
}

pub async fn get_commission_tiers(state: &AppState) -> ApiResult<Value> {
    let tiers = state.db.commission_tiers().list().await?;
    Ok(json!({ "tiers": tiers }))
}

pub async fn save_commission_tiers(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: TiersPayload = decode(payload)?;
    validate_commission_tiers(&payload.tiers)?;

    let tiers = state.db.commission_tiers().replace_all(&payload.tiers).await?;
    Ok(json!({ "tiers": tiers }))
}
