//! # Actions Module
//!
//! Everything the front end can ask for goes through `POST /api`.
//!
//! ## Action Organization
//! ```text
//! actions/
//! ├── mod.rs          ◄─── You are here (request envelope + dispatch)
//! ├── staff.rs        ◄─── login, staff lists, staff management
//! ├── orders.rs       ◄─── checkout, installments, cancellation
//! ├── appointments.rs ◄─── booking, listing, rescheduling
//! ├── customers.rs    ◄─── search, full history, service usage
//! ├── summary.rs      ◄─── sales and commission summary
//! ├── settings.rs     ◄─── alert settings, commission tiers
//! └── upload.rs       ◄─── image upload passthrough
//! ```
//!
//! ## How Actions Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  { "action": "add_payment", "payload": { "orderId": 12, ... } }         │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  RawRequest ── action string ──► Action enum (unknown → 400)            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  orders::add_payment(&state, payload)                                   │
//! │    ├── decode payload into a typed struct (serde, camelCase)            │
//! │    ├── validate fields (clinic_core::validation)                        │
//! │    └── call repositories (clinic_db)                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  200 { "success": true, "paymentId": 31 }                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod appointments;
pub mod customers;
pub mod orders;
pub mod settings;
pub mod staff;
pub mod summary;
pub mod upload;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// The request envelope.
#[derive(Debug, Deserialize)]
pub struct RawRequest {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

/// Every supported action name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Login,
    GetStaff,
    GetAllUsers,
    ManageStaff,
    SaveOrder,
    AddPayment,
    CancelOrder,
    GetAppointments,
    SaveAppointment,
    UpdateAppointment,
    RecordServiceUsage,
    SearchCustomers,
    GetCustomerFullDetail,
    GetSalesSummary,
    GetSettings,
    SaveSettings,
    GetCommissionTiers,
    SaveCommissionTiers,
    UploadImage,
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn parse(name: &str) -> Action {
        Action::deserialize(de::value::StrDeserializer::<de::value::Error>::new(name))
            .unwrap_or(Action::Unknown)
    }
}

/// Successful response: `success: true` plus the action's fields.
#[derive(Debug, Serialize)]
pub struct Envelope {
    success: bool,
    #[serde(flatten)]
    body: serde_json::Map<String, Value>,
}

impl Envelope {
    fn ok(body: Value) -> Self {
        let body = match body {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Envelope {
            success: true,
            body,
        }
    }
}

/// `POST /api`
pub async fn handle(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Envelope>> {
    let request: RawRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::validation("Invalid request body"))?;
    let action = Action::parse(&request.action);
    debug!(action = %request.action, "Dispatching action");

    let payload = request.payload;
    let body = match action {
        Action::Login => staff::login(&state, payload).await?,
        Action::GetStaff => staff::get_staff(&state).await?,
        Action::GetAllUsers => staff::get_all_users(&state).await?,
        Action::ManageStaff => staff::manage_staff(&state, payload).await?,
        Action::SaveOrder => orders::save_order(&state, payload).await?,
        Action::AddPayment => orders::add_payment(&state, payload).await?,
        Action::CancelOrder => orders::cancel_order(&state, payload).await?,
        Action::GetAppointments => appointments::get_appointments(&state).await?,
        Action::SaveAppointment => appointments::save_appointment(&state, payload).await?,
        Action::UpdateAppointment => appointments::update_appointment(&state, payload).await?,
        Action::RecordServiceUsage => customers::record_service_usage(&state, payload).await?,
        Action::SearchCustomers => customers::search_customers(&state, payload).await?,
        Action::GetCustomerFullDetail => customers::get_customer_full_detail(&state, payload).await?,
        Action::GetSalesSummary => summary::get_sales_summary(&state, payload).await?,
        Action::GetSettings => settings::get_settings(&state).await?,
        Action::SaveSettings => settings::save_settings(&state, payload).await?,
        Action::GetCommissionTiers => settings::get_commission_tiers(&state).await?,
        Action::SaveCommissionTiers => settings::save_commission_tiers(&state, payload).await?,
        Action::UploadImage => upload::upload_image(&state, payload).await?,
        Action::Unknown => return Err(ApiError::invalid_action()),
    };

    Ok(Json(Envelope::ok(body)))
}

// =============================================================================
// Payload Helpers
// =============================================================================

/// Decodes an action payload. A missing payload reads as `{}`.
pub(crate) fn decode<T: DeserializeOwned>(payload: Value) -> ApiResult<T> {
    let payload = match payload {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    Ok(serde_json::from_value(payload)?)
}

fn int_from_value<E: de::Error>(value: Value) -> Result<Option<i64>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| E::custom("expected an integer")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| E::custom("expected an integer")),
        _ => Err(E::custom("expected an integer")),
    }
}

/// Optional integer that forms may send as `""`, `null`, a number or
/// numeric text. Use with `#[serde(default, deserialize_with = ...)]`.
pub(crate) fn optional_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    int_from_value(Value::deserialize(deserializer)?)
}

/// Required integer id, number or numeric text.
pub(crate) fn required_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    int_from_value(Value::deserialize(deserializer)?)?
        .ok_or_else(|| de::Error::custom("expected an integer"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse("save_order"), Action::SaveOrder);
        assert_eq!(Action::parse("get_customer_full_detail"), Action::GetCustomerFullDetail);
        assert_eq!(Action::parse("drop_tables"), Action::Unknown);
        assert_eq!(Action::parse(""), Action::Unknown);
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Ids {
        #[serde(deserialize_with = "required_int")]
        order_id: i64,
        #[serde(default, deserialize_with = "optional_int")]
        dr_id: Option<i64>,
    }

    #[test]
    fn test_lenient_ids() {
        let ids: Ids = decode(json!({ "orderId": "12", "drId": "" })).unwrap();
        assert_eq!(ids.order_id, 12);
        assert_eq!(ids.dr_id, None);

        let ids: Ids = decode(json!({ "orderId": 7, "drId": 3 })).unwrap();
        assert_eq!(ids.dr_id, Some(3));

        let ids: Ids = decode(json!({ "orderId": 7 })).unwrap();
        assert_eq!(ids.dr_id, None);

        assert!(decode::<Ids>(json!({ "orderId": "" })).is_err());
        assert!(decode::<Ids>(json!({ "orderId": 1.5 })).is_err());
        assert!(decode::<Ids>(Value::Null).is_err());
    }

    #[test]
    fn test_envelope_flattens_body() {
        let value = serde_json::to_value(Envelope::ok(json!({ "orderId": 5 }))).unwrap();
        assert_eq!(value, json!({ "success": true, "orderId": 5 }));

        let value = serde_json::to_value(Envelope::ok(json!({}))).unwrap();
        assert_eq!(value, json!({ "success": true }));
    }
}
