//! # Staff Actions
//!
//! PIN login, staff pickers and staff account management.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{decode, required_int};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use clinic_core::validation::{validate_display_name, validate_pin, validate_username};
use clinic_core::{Role, StaffMember};
use clinic_db::NewStaff;

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    pin: String,
}

/// Staff picker entry (no username).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StaffEntry {
    id: i64,
    display_name: String,
    role: Role,
}

impl From<StaffMember> for StaffEntry {
    fn from(staff: StaffMember) -> Self {
        StaffEntry {
            id: staff.id,
            display_name: staff.display_name,
            role: staff.role,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "subAction", rename_all = "snake_case")]
enum ManageStaff {
    Add {
        username: String,
        pin: String,
        name: String,
        role: Role,
    },
    ResetPin {
        #[serde(deserialize_with = "required_int")]
        id: i64,
        pin: String,
    },
    Delete {
        #[serde(deserialize_with = "required_int")]
        id: i64,
    },
}

pub async fn login(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: LoginPayload = decode(payload)?;

    let user = state
        .db
        .users()
        .authenticate(payload.username.trim(), &payload.pin)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or PIN"))?;

    info!(user_id = user.id, role = %user.role, "Staff logged in");
    Ok(json!({ "user": user }))
}

pub async fn get_staff(state: &AppState) -> ApiResult<Value> {
    let staff: Vec<StaffEntry> = state
        .db
        .users()
        .list_staff()
        .await?
        .into_iter()
        .map(StaffEntry::from)
        .collect();

    Ok(json!({ "staff": staff }))
}

pub async fn get_all_users(state: &AppState) -> ApiResult<Value> {
    let users = state.db.users().list_all().await?;
    Ok(json!({ "users": users }))
}

pub async fn manage_staff(state: &AppState, payload: Value) -> ApiResult<Value> {
    match decode::<ManageStaff>(payload)? {
        ManageStaff::Add {
            username,
            pin,
            name,
            role,
        } => {
            let username = validate_username(&username)?;
            validate_pin(&pin)?;
            let display_name = validate_display_name(&name)?;

            let staff = state
                .db
                .users()
                .create(&NewStaff {
                    username,
                    pin,
                    display_name,
                    role,
                })
                .await?;
            info!(user_id = staff.id, role = %staff.role, "Staff account created");
            Ok(json!({ "id": staff.id }))
        }
        ManageStaff::ResetPin { id, pin } => {
            validate_pin(&pin)?;
            state.db.users().reset_pin(id, &pin).await?;
            info!(user_id = id, "Staff PIN reset");
            Ok(json!({}))
        }
        ManageStaff::Delete { id } => {
            state.db.users().delete(id).await?;
            info!(user_id = id, "Staff account deleted");
            Ok(json!({}))
        }
    }
}
