//! # Appointment Actions

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{decode, optional_int, required_int};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use clinic_core::validation::{
    validate_date, validate_details, validate_person_name, validate_phone, validate_time,
};
use clinic_core::LIST_LIMIT;
use clinic_db::{AppointmentContact, NewAppointment};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveAppointmentPayload {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    details: String,
    #[serde(default, deserialize_with = "optional_int")]
    dr_id: Option<i64>,
    #[serde(default, deserialize_with = "optional_int")]
    bt_id: Option<i64>,
    #[serde(default, deserialize_with = "optional_int")]
    current_user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAppointmentPayload {
    #[serde(deserialize_with = "required_int")]
    id: i64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    new_date: Option<String>,
    #[serde(default)]
    new_time: Option<String>,
}

pub async fn get_appointments(state: &AppState) -> ApiResult<Value> {
    let appointments = state.db.appointments().list_scheduled(LIST_LIMIT).await?;
    Ok(json!({ "appointments": appointments }))
}

pub async fn save_appointment(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: SaveAppointmentPayload = decode(payload)?;

    let contact = AppointmentContact {
        first_name: validate_person_name("firstName", &payload.first_name)?,
        last_name: payload.last_name.trim().to_string(),
        phone: validate_phone(&payload.phone)?,
    };
    let appointment = NewAppointment {
        date: validate_date("date", &payload.date)?,
        time: validate_time("time", &payload.time)?,
        details: validate_details(&payload.details)?,
        doctor_id: payload.dr_id,
        therapist_id: payload.bt_id,
        created_by: payload.current_user_id,
    };

    let id = state.db.appointments().create(&contact, &appointment).await?;
    info!(appointment_id = id, date = %appointment.date, "Appointment booked");
    Ok(json!({ "appointmentId": id }))
}

/// `status: "Cancelled"` cancels; anything else reschedules to
/// `newDate` / `newTime`.
pub async fn update_appointment(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: UpdateAppointmentPayload = decode(payload)?;

    if payload.status.as_deref() == Some("Cancelled") {
        state.db.appointments().cancel(payload.id).await?;
        info!(appointment_id = payload.id, "Appointment cancelled");
        return Ok(json!({}));
    }

    let (Some(new_date), Some(new_time)) = (payload.new_date, payload.new_time) else {
        return Err(ApiError::validation("newDate and newTime are required"));
    };
    let date = validate_date("newDate", &new_date)?;
    let time = validate_time("newTime", &new_time)?;

    state.db.appointments().reschedule(payload.id, date, time).await?;
    info!(appointment_id = payload.id, date = %date, "Appointment rescheduled");
    Ok(json!({}))
}
