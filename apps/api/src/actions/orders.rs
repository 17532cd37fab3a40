//! # Order Actions
//!
//! Checkout, installment payments and cancellation.
//!
//! ## Checkout
//! ```text
//! save_order
//!   ├── validate customer + order fields
//!   ├── db.orders().create()   one transaction:
//!   │     upsert customer by phone → insert order → initial payment (> 0)
//!   └── new-order alert         spawned after commit, never fails the order
//! ```

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{decode, optional_int, required_int};
use crate::error::{ApiError, ApiResult};
use crate::notify::{format_new_order_message, NewOrderAlert};
use crate::AppState;
use clinic_core::validation::{
    validate_age, validate_payment_amount, validate_person_name, validate_phone, validate_price,
};
use clinic_core::{Money, PaymentMethod};
use clinic_db::{InitialPayment, NewCustomer, NewOrder, NewPayment};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveOrderPayload {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    phone: String,
    #[serde(default, deserialize_with = "optional_int")]
    age: Option<i64>,
    #[serde(default)]
    disease: Option<String>,
    #[serde(default, alias = "pdpaConsent")]
    pdpa: bool,
    #[serde(deserialize_with = "required_int")]
    sale_staff_id: i64,
    #[serde(default)]
    items: Value,
    total_price: Money,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "optional_int")]
    current_user_id: Option<i64>,
    /// Defaults to the full total.
    #[serde(default)]
    paid_amount: Option<Money>,
    #[serde(default)]
    payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPaymentPayload {
    #[serde(deserialize_with = "required_int")]
    order_id: i64,
    amount: Money,
    #[serde(default, alias = "paymentMethod")]
    method: PaymentMethod,
    #[serde(default, deserialize_with = "optional_int")]
    current_user_id: Option<i64>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderIdPayload {
    #[serde(deserialize_with = "required_int")]
    order_id: i64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn save_order(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: SaveOrderPayload = decode(payload)?;

    let first_name = validate_person_name("firstName", &payload.first_name)?;
    let last_name = payload.last_name.trim().to_string();
    let phone = validate_phone(&payload.phone)?;
    validate_age(payload.age)?;
    validate_price("totalPrice", payload.total_price)?;
    if !payload.items.is_array() {
        return Err(ApiError::validation("items must be a list"));
    }

    let paid = payload.paid_amount.unwrap_or(payload.total_price);
    validate_price("paidAmount", paid)?;
    let initial_payment = paid.is_positive().then(|| InitialPayment {
        amount: paid,
        method: payload.payment_method.unwrap_or_default(),
    });

    let customer = NewCustomer {
        first_name,
        last_name,
        phone,
        age: payload.age,
        disease: non_empty(payload.disease),
        pdpa_consent: payload.pdpa,
    };
    let order = NewOrder {
        sale_staff_id: payload.sale_staff_id,
        created_by: payload.current_user_id,
        items: payload.items,
        total_price: payload.total_price,
        image_url: non_empty(payload.image_url),
        initial_payment,
    };

    let created = state.db.orders().create(&customer, &order).await?;
    info!(
        order_id = created.order_id,
        customer_id = created.customer_id,
        total = %order.total_price,
        "Order saved"
    );

    alert_new_order(state, &customer, &order).await;

    Ok(json!({
        "orderId": created.order_id,
        "customerId": created.customer_id,
        "paymentId": created.payment_id,
    }))
}

/// Queues the chat alert when enabled. Lookup failures are only logged.
async fn alert_new_order(state: &AppState, customer: &NewCustomer, order: &NewOrder) {
    let settings = match state.db.settings().get().await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Could not read alert settings");
            return;
        }
    };
    let Some((token, chat_id)) = settings.new_order_alert_target() else {
        return;
    };

    let staff_name = match state.db.users().get(order.sale_staff_id).await {
        Ok(staff) => staff.map(|s| s.display_name),
        Err(e) => {
            warn!(error = %e, "Could not resolve sale staff for alert");
            None
        }
    };

    let customer_name = format!("{} {}", customer.first_name, customer.last_name);
    let text = format_new_order_message(&NewOrderAlert {
        customer_name: customer_name.trim(),
        items: &order.items,
        total: order.total_price,
        staff_name: staff_name.as_deref(),
    });

    state
        .notifier
        .send_in_background(token.to_string(), chat_id.to_string(), text);
}

pub async fn add_payment(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: AddPaymentPayload = decode(payload)?;
    validate_payment_amount(payload.amount)?;

    let payment_id = state
        .db
        .payments()
        .add(&NewPayment {
            order_id: payload.order_id,
            amount: payload.amount,
            method: payload.method,
            received_by: payload.current_user_id,
            image_url: non_empty(payload.image_url),
        })
        .await?;

    info!(
        order_id = payload.order_id,
        payment_id,
        amount = %payload.amount,
        "Payment recorded"
    );
    Ok(json!({ "paymentId": payment_id }))
}

pub async fn cancel_order(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: OrderIdPayload = decode(payload)?;
    state.db.orders().cancel(payload.order_id).await?;
    info!(order_id = payload.order_id, "Order cancelled");
    Ok(json!({}))
}
