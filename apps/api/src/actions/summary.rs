//! # Sales Summary Action
//!
//! Loads one reporting period and runs the commission aggregator.
//!
//! ```text
//! month "2025-03"  ─┐
//!                   ├─► DateRange ──► UTC bounds [from, until) in the
//! start/end dates  ─┘                 business time zone
//!                                         │
//!       orders, payments, tiers, staff, card fee (parallel reads)
//!                                         │
//!                                         ▼
//!                     summarize(input, requester from users table)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode, required_int};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use clinic_core::{summarize, DateRange, Requester, SalesInput, SalesSummary, SummaryOptions};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryPayload {
    #[serde(default)]
    month: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(alias = "currentUserId", deserialize_with = "required_int")]
    user_id: i64,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    #[serde(flatten)]
    summary: SalesSummary,
    #[serde(flatten)]
    range: DateRange,
}

impl SummaryPayload {
    fn range(&self) -> ApiResult<DateRange> {
        let month = self.month.as_deref().map(str::trim).filter(|m| !m.is_empty());
        if let Some(month) = month {
            return Ok(DateRange::month(month)?);
        }

        match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(start), Some(end)) => Ok(DateRange::parse(start, end)?),
            _ => Err(ApiError::validation("month or startDate and endDate are required")),
        }
    }
}

pub async fn get_sales_summary(state: &AppState, payload: Value) -> ApiResult<Value> {
    let payload: SummaryPayload = decode(payload)?;
    let range = payload.range()?;

    let requester = state
        .db
        .users()
        .get(payload.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

    let (from, until) = range.utc_bounds(state.utc_offset);
    debug!(%from, %until, days = range.days(), user_id = requester.id, "Building sales summary");

    let (order_repo, payment_repo, tier_repo, user_repo, settings_repo) = (
        state.db.orders(),
        state.db.payments(),
        state.db.commission_tiers(),
        state.db.users(),
        state.db.settings(),
    );
    let (orders, payments, tiers, staff, settings) = tokio::try_join!(
        order_repo.list_for_period(from, until),
        payment_repo.list_for_period(from, until),
        tier_repo.list(),
        user_repo.list_all(),
        settings_repo.get(),
    )?;

    let summary = summarize(
        SalesInput {
            orders: &orders,
            payments: &payments,
            tiers: &tiers,
            staff: &staff,
        },
        Requester {
            user_id: requester.id,
            role: requester.role,
        },
        SummaryOptions {
            card_fee: settings.card_fee_percent,
            utc_offset: state.utc_offset,
        },
    );

    Ok(serde_json::to_value(SummaryResponse { summary, range })?)
}
