//! # Customer Actions
//!
//! Lookup, full history (with outstanding debt) and service usage.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{decode, optional_int, required_int};
use crate::error::ApiResult;
use crate::AppState;
use clinic_core::validation::{validate_date, validate_details, validate_search_query};
use clinic_core::LIST_LIMIT;
use clinic_db::NewServiceUsage;

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerIdPayload {
    #[serde(deserialize_with = "required_int")]
    customer_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceUsagePayload {
    #[serde(deserialize_with = "required_int")]
    customer_id: i64,
    #[serde(default, deserialize_with = "optional_int")]
    order_id: Option<i64>,
    #[serde(default)]
    usage_date: String,
    #[serde(default)]
    details: String,
    #[serde(default, deserialize_with = "optional_int")]
    dr_id: Option<i64>,
}

pub async fn search_customers(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: SearchPayload = decode(payload)?;
    let query = validate_search_query(&payload.query)?;

    let customers = state.db.customers().search(&query, LIST_LIMIT).await?;
    Ok(json!({ "customers": customers }))
}

pub async fn get_customer_full_detail(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: CustomerIdPayload = decode(payload)?;
    let detail = state.db.customers().full_detail(payload.customer_id).await?;
    Ok(serde_json::to_value(detail)?)
}

pub async fn record_service_usage(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: ServiceUsagePayload = decode(payload)?;

    let usage = NewServiceUsage {
        customer_id: payload.customer_id,
        order_id: payload.order_id,
        usage_date: validate_date("usageDate", &payload.usage_date)?,
        details: validate_details(&payload.details)?,
        doctor_id: payload.dr_id,
    };

    let id = state.db.service_usage().record(&usage).await?;
    info!(usage_id = id, customer_id = usage.customer_id, "Service usage recorded");
    Ok(json!({ "usageId": id }))
}
