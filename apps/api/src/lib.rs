//! # clinic-api: Action Endpoint for the Clinic POS
//!
//! A single `POST /api` endpoint. Every request names an `action` and
//! carries a `payload`; the response is always a JSON envelope with a
//! `success` flag.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Clinic API Server                                │
//! │                                                                         │
//! │  Front end ──► POST /api ──► actions::handle ──► clinic-db ──► SQLite   │
//! │                    │               │                                    │
//! │               TraceLayer           ├──► notify (chat alert, spawned)    │
//! │               body limit           └──► upload (storage passthrough)    │
//! │                                                                         │
//! │  GET /health ──► { success, database }                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod notify;
pub mod upload;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::FixedOffset;
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::notify::TelegramNotifier;
use crate::upload::DriveUploader;
use clinic_db::Database;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub notifier: TelegramNotifier,
    /// `None` when upload credentials are not configured.
    pub uploader: Option<Arc<DriveUploader>>,
    /// Business time zone for reporting days.
    pub utc_offset: FixedOffset,
}

impl AppState {
    pub fn new(db: Database, config: &ApiConfig) -> Self {
        let client = reqwest::Client::new();
        let uploader = config.drive.as_ref().map(|drive| {
            Arc::new(DriveUploader::new(
                client.clone(),
                drive.credentials.clone(),
                drive.folder_id.clone(),
            ))
        });

        AppState {
            db,
            notifier: TelegramNotifier::new(client, config.telegram_api_base.clone()),
            uploader,
            utc_offset: config.utc_offset,
        }
    }
}

/// Builds the HTTP router.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api", post(actions::handle).fallback(method_not_allowed))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = state.db.health_check().await;
    Json(json!({ "success": true, "database": database }))
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use clinic_db::DbConfig;
    use tower::ServiceExt;

    async fn app() -> Router {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ApiConfig::from_lookup(|name| match name {
            "TELEGRAM_API_BASE" => Some("http://127.0.0.1:9".to_string()),
            _ => None,
        })
        .unwrap();
        router(AppState::new(db, &config), config.max_body_bytes)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn call(app: &Router, action: &str, payload: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "action": action, "payload": payload }).to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn add_staff(app: &Router, username: &str, role: &str) -> i64 {
        let (status, body) = call(
            app,
            "manage_staff",
            json!({ "subAction": "add", "username": username, "pin": "1234", "name": username.to_uppercase(), "role": role }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_i64().unwrap()
    }

    fn order_payload(staff_id: i64, phone: &str, extra: Value) -> Value {
        let mut payload = json!({
            "firstName": "Malee",
            "lastName": "Suk",
            "phone": phone,
            "age": "",
            "pdpa": true,
            "saleStaffId": staff_id,
            "items": [{ "name": "Laser", "price": 1000, "total": 1000, "deduct_percent": 10 }],
            "totalPrice": 1000,
            "currentUserId": staff_id,
            "paymentMethod": "cash"
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut payload, extra) {
            base.extend(extra);
        }
        payload
    }

    #[tokio::test]
    async fn test_envelope_errors() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Request::builder().method("GET").uri("/api").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "success": false, "message": "Method Not Allowed" }));

        let (status, body) = send(
            &app,
            Request::builder().method("POST").uri("/api").body(Body::from("{not json")).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = call(&app, "drop_tables", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid action");

        let (status, body) = call(&app, "cancel_order", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid payload"));
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "database": true }));
    }

    #[tokio::test]
    async fn test_login_and_staff_management() {
        let app = app().await;
        let id = add_staff(&app, "aom", "Sales").await;
        add_staff(&app, "drchai", "Dr").await;

        let (status, body) = call(&app, "login", json!({ "username": "aom", "pin": "9999" })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, body) = call(&app, "login", json!({ "username": "aom", "pin": "1234" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], id);
        assert_eq!(body["user"]["displayName"], "AOM");
        assert_eq!(body["user"]["role"], "Sales");

        let (_, body) = call(&app, "get_staff", json!({})).await;
        let staff = body["staff"].as_array().unwrap();
        assert_eq!(staff.len(), 2);
        assert!(staff[0].get("username").is_none());

        let (status, _) = call(
            &app,
            "manage_staff",
            json!({ "subAction": "add", "username": "aom", "pin": "1234", "name": "Again", "role": "Sales" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "manage_staff", json!({ "subAction": "reset_pin", "id": id, "pin": "5678" })).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "login", json!({ "username": "aom", "pin": "5678" })).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "manage_staff", json!({ "subAction": "delete", "id": id })).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, "get_all_users", json!({})).await;
        assert_eq!(body["users"].as_array().unwrap().len(), 1);

        let (status, _) = call(&app, "manage_staff", json!({ "subAction": "promote", "id": 1 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sales_summary_commission_and_redaction() {
        let app = app().await;
        let owner = add_staff(&app, "owner", "Owner").await;
        let sales = add_staff(&app, "aom", "Sales").await;
        let other = add_staff(&app, "bee", "BT").await;

        let (status, _) = call(
            &app,
            "save_commission_tiers",
            json!({ "tiers": [
                { "minSales": 1000, "percent": 10 },
                { "minSales": 0, "maxSales": 999, "percent": 5 }
            ] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "save_order", order_payload(sales, "0811111111", json!({}))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let (status, _) = call(
            &app,
            "save_order",
            order_payload(other, "0822222222", json!({ "totalPrice": 500, "items": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let today = Utc::now().with_timezone(&FixedOffset::east_opt(7 * 3600).unwrap()).date_naive();
        let range = json!({
            "startDate": (today - Duration::days(1)).format("%Y-%m-%d").to_string(),
            "endDate": (today + Duration::days(1)).format("%Y-%m-%d").to_string(),
        });

        let mut payload = range.clone();
        payload["userId"] = json!(owner);
        let (status, body) = call(&app, "get_sales_summary", payload).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let staff = body["staffPerf"].as_array().unwrap();
        assert_eq!(staff.len(), 2);
        assert_eq!(staff[0]["id"], sales);
        assert_eq!(staff[0]["totalSales"], 1000);
        assert_eq!(staff[0]["totalCost"], 100);
        assert_eq!(staff[0]["totalCollected"], 1000);
        assert_eq!(staff[0]["netCollected"], 900);
        assert_eq!(staff[0]["commissionPercent"], 10);
        assert_eq!(staff[0]["commissionAmount"], 90);
        assert_eq!(staff[1]["commissionPercent"], 5);
        assert_eq!(body["shopSummary"], json!({ "totalSales": 1500, "totalCollected": 1500 }));
        assert_eq!(body["startDate"], range["startDate"]);

        let mut payload = range.clone();
        payload["userId"] = json!(sales);
        let (_, body) = call(&app, "get_sales_summary", payload).await;
        let staff = body["staffPerf"].as_array().unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0]["id"], sales);
        assert_eq!(body["shopSummary"], json!({ "totalSales": 0, "totalCollected": 0 }));

        let mut payload = range.clone();
        payload["userId"] = json!(4242);
        let (status, _) = call(&app, "get_sales_summary", payload).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "get_sales_summary", json!({ "month": "2025-13", "userId": owner })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_month_summary_nets_card_fee() {
        let app = app().await;
        let owner = add_staff(&app, "owner", "Owner").await;
        let sales = add_staff(&app, "aom", "Sales").await;

        let (status, body) = call(&app, "save_settings", json!({ "cardFeePercent": 3 })).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (status, body) = call(
            &app,
            "save_order",
            order_payload(sales, "0811111111", json!({ "paymentMethod": "credit_card" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let today = Utc::now().with_timezone(&FixedOffset::east_opt(7 * 3600).unwrap()).date_naive();
        let month = today.format("%Y-%m").to_string();
        let (status, body) = call(&app, "get_sales_summary", json!({ "month": month, "userId": owner })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["startDate"], format!("{}-01", month));

        let staff = body["staffPerf"].as_array().unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0]["totalSales"], 1000);
        assert_eq!(staff[0]["totalCollected"], 970);
        assert_eq!(body["shopSummary"], json!({ "totalSales": 1000, "totalCollected": 970 }));

        // A month with no orders.
        let (status, body) = call(
            &app,
            "get_sales_summary",
            json!({ "startDate": "2000-01-01", "endDate": "2000-01-31", "userId": owner }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shopSummary"], json!({ "totalSales": 0, "totalCollected": 0 }));
    }

    #[tokio::test]
    async fn test_installments_debt_and_cancellation() {
        let app = app().await;
        let sales = add_staff(&app, "aom", "Sales").await;

        let (_, body) = call(
            &app,
            "save_order",
            order_payload(sales, "0811111111", json!({ "paidAmount": 400, "paymentMethod": "credit_card" })),
        )
        .await;
        let order_id = body["orderId"].as_i64().unwrap();
        let customer_id = body["customerId"].as_i64().unwrap();

        let (status, body) = call(
            &app,
            "add_payment",
            json!({ "orderId": order_id, "amount": "100", "method": "transfer", "currentUserId": sales }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (status, _) = call(&app, "add_payment", json!({ "orderId": order_id, "amount": 0 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, "get_customer_full_detail", json!({ "customerId": customer_id })).await;
        assert_eq!(body["customer"]["phone"], "0811111111");
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);
        assert_eq!(body["orders"][0]["saleStaffName"], "AOM");
        assert_eq!(body["payments"].as_array().unwrap().len(), 2);
        assert_eq!(body["totalDebt"], 500);

        let (status, _) = call(&app, "cancel_order", json!({ "orderId": order_id })).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "add_payment", json!({ "orderId": order_id, "amount": 500 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&app, "cancel_order", json!({ "orderId": 999 })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = call(&app, "get_customer_full_detail", json!({ "customerId": customer_id })).await;
        assert_eq!(body["totalDebt"], 0);

        let (status, _) = call(&app, "get_customer_full_detail", json!({ "customerId": 999 })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_save_order_validation() {
        let app = app().await;
        let sales = add_staff(&app, "aom", "Sales").await;

        let (status, body) = call(&app, "save_order", order_payload(sales, "12", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "phone must be at least 6 characters");

        let (status, _) = call(&app, "save_order", order_payload(sales, "0811111111", json!({ "totalPrice": -5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "save_order", order_payload(sales, "0811111111", json!({ "items": "Laser" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "save_order", order_payload(sales, "0811111111", json!({ "saleStaffId": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_appointments_and_service_usage() {
        let app = app().await;
        let doctor = add_staff(&app, "drchai", "Dr").await;

        let (status, body) = call(
            &app,
            "save_appointment",
            json!({
                "firstName": "Malee", "lastName": "Suk", "phone": "0811111111",
                "date": "2030-01-10", "time": "14:30", "details": "Botox",
                "drId": doctor, "btId": "", "currentUserId": doctor
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let id = body["appointmentId"].as_i64().unwrap();

        let (_, body) = call(&app, "get_appointments", json!({})).await;
        let appointments = body["appointments"].as_array().unwrap();
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0]["doctorName"], "DRCHAI");
        assert_eq!(appointments[0]["therapistName"], Value::Null);
        let customer_id = appointments[0]["customerId"].as_i64().unwrap();

        let (status, _) = call(&app, "update_appointment", json!({ "id": id, "newDate": "2030-01-12" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(
            &app,
            "update_appointment",
            json!({ "id": id, "newDate": "2030-01-12", "newTime": "09:00" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, "get_appointments", json!({})).await;
        assert_eq!(body["appointments"][0]["appointmentDate"], "2030-01-12");
        assert_eq!(body["appointments"][0]["appointmentTime"], "09:00");

        let (status, _) = call(&app, "update_appointment", json!({ "id": id, "status": "Cancelled" })).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, "get_appointments", json!({})).await;
        assert!(body["appointments"].as_array().unwrap().is_empty());

        let (status, body) = call(
            &app,
            "record_service_usage",
            json!({ "customerId": customer_id, "usageDate": "2030-01-12", "details": "Session 1", "drId": doctor }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (_, body) = call(&app, "search_customers", json!({ "query": "mal" })).await;
        assert_eq!(body["customers"].as_array().unwrap().len(), 1);
        let (_, body) = call(&app, "get_customer_full_detail", json!({ "customerId": customer_id })).await;
        assert_eq!(body["usage"][0]["doctorName"], "DRCHAI");
    }

    #[tokio::test]
    async fn test_settings_and_upload_config() {
        let app = app().await;

        let (status, _) = call(
            &app,
            "save_settings",
            json!({ "tgToken": "123:abc", "tgChatId": "-100", "cardFeePercent": 3 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, "save_settings", json!({ "alert_new_order": true, "tgToken": "" })).await;
        assert_eq!(body["settings"]["tgToken"], Value::Null);
        assert_eq!(body["settings"]["tgChatId"], "-100");
        assert_eq!(body["settings"]["alertNewOrder"], true);
        assert_eq!(body["settings"]["cardFeePercent"], 3);

        let (status, _) = call(&app, "save_settings", json!({ "cardFeePercent": 101 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "upload_image", json!({ "base64": "aGVsbG8=" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Missing GDrive Config");

        let (status, body) = call(
            &app,
            "save_commission_tiers",
            json!({ "tiers": [{ "minSales": 500, "maxSales": 100, "percent": 5 }] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("tiers[0].maxSales"));
        let (_, body) = call(&app, "get_commission_tiers", json!({})).await;
        assert!(body["tiers"].as_array().unwrap().is_empty());
    }
}
