//! # Sales & Commission Aggregation
//!
//! Turns one period's orders, payments and commission tiers into per-staff
//! performance and a shop-wide summary.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        summarize()                                      │
//! │                                                                         │
//! │  orders ──► bucket by staff_id ──► total_sales, total_cost, order_count│
//! │                                                                         │
//! │  payments ──► owning order? ──no──► skipped                             │
//! │                  │ yes                                                  │
//! │                  ▼                                                      │
//! │            card? ─► less fee ──► total_collected                        │
//! │                                                                         │
//! │  per bucket:                                                            │
//! │     net        = max(0, collected − cost)                               │
//! │     percent    = match_tier(tiers, total_sales)                         │
//! │     commission = net × percent / 100                                    │
//! │                                                                         │
//! │  role redaction ──► sort by total_sales desc ──► SalesSummary           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The computation is pure and infallible. Malformed line numbers were
//! already coerced to zero when the lines were decoded, and tiers are typed
//! records validated when they were saved.

use std::collections::{BTreeMap, HashMap};

use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;

use crate::money::Money;
use crate::period::local_date;
use crate::types::{
    CommissionTier, Order, OrderStatus, Payment, Rate, Role, StaffMember, Visibility,
};

// =============================================================================
// Inputs
// =============================================================================

/// Records fetched for one reporting period.
///
/// `orders` should already be limited to the period; `payments` to those
/// made in the period. Anything inconsistent (cancelled orders, payments
/// for orders outside the set) is ignored rather than rejected.
#[derive(Debug, Clone, Copy)]
pub struct SalesInput<'a> {
    pub orders: &'a [Order],
    pub payments: &'a [Payment],
    pub tiers: &'a [CommissionTier],
    /// Directory used only for display names.
    pub staff: &'a [StaffMember],
}

/// Who is asking. Decides what the summary reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    /// Fee deducted from credit card payments.
    pub card_fee: Rate,
    /// Business time zone, for grouping orders into days.
    pub utc_offset: FixedOffset,
}

// =============================================================================
// Outputs
// =============================================================================

/// One staff member's figures for the period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPerformance {
    pub id: i64,
    /// `None` when the id is not in the staff directory.
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub order_count: u32,
    pub total_sales: Money,
    pub total_collected: Money,
    pub total_cost: Money,
    pub net_collected: Money,
    pub commission_percent: Rate,
    pub commission_amount: Money,
}

/// Shop-wide totals. Zeroed for operational roles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopSummary {
    pub total_sales: Money,
    pub total_collected: Money,
}

/// Order totals for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub date: NaiveDate,
    pub total_sales: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    #[serde(rename = "staffPerf")]
    pub staff: Vec<StaffPerformance>,
    #[serde(rename = "shopSummary")]
    pub shop: ShopSummary,
    pub daily_sales: Vec<DailySales>,
}

// =============================================================================
// Tier Matching
// =============================================================================

/// Commission percentage for a sales total.
///
/// Tiers are scanned in ascending `min_sales` order (stable for equal
/// minimums) and the **last** one containing `sales` wins. With no match the
/// lowest tier's percentage applies; with no tiers, zero.
///
/// ```rust
/// use clinic_core::commission::match_tier;
/// use clinic_core::money::Money;
/// use clinic_core::types::{CommissionTier, Rate};
///
/// let tiers = vec![
///     CommissionTier { id: 1, min_sales: Money::zero(), max_sales: Some(Money::from_major(999)), percent: Rate::from_percent(5) },
///     CommissionTier { id: 2, min_sales: Money::from_major(1000), max_sales: None, percent: Rate::from_percent(10) },
/// ];
/// assert_eq!(match_tier(&tiers, Money::from_major(999)), Rate::from_percent(5));
/// assert_eq!(match_tier(&tiers, Money::from_major(1000)), Rate::from_percent(10));
/// ```
pub fn match_tier(tiers: &[CommissionTier], sales: Money) -> Rate {
    let mut ordered: Vec<&CommissionTier> = tiers.iter().collect();
    ordered.sort_by_key(|tier| tier.min_sales);

    let mut matched = None;
    for tier in &ordered {
        if tier.contains(sales) {
            matched = Some(tier.percent);
        }
    }

    matched
        .or_else(|| ordered.first().map(|tier| tier.percent))
        .unwrap_or_default()
}

// =============================================================================
// Aggregation
// =============================================================================

#[derive(Debug, Default)]
struct Bucket {
    order_count: u32,
    total_sales: Money,
    total_collected: Money,
    total_cost: Money,
}

/// Aggregates one period for `requester`.
pub fn summarize(
    input: SalesInput<'_>,
    requester: Requester,
    options: SummaryOptions,
) -> SalesSummary {
    let visibility = requester.role.report_visibility();
    let visible = |staff_id: i64| match visibility {
        Visibility::Shop => true,
        Visibility::OwnOnly => staff_id == requester.user_id,
    };

    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
    let mut order_owner: HashMap<i64, i64> = HashMap::new();
    let mut daily: BTreeMap<NaiveDate, Money> = BTreeMap::new();
    let mut shop = ShopSummary::default();

    for order in input
        .orders
        .iter()
        .filter(|order| order.status == OrderStatus::Active)
    {
        let bucket = buckets.entry(order.staff_id).or_default();
        bucket.order_count += 1;
        bucket.total_sales += order.total_price;
        bucket.total_cost += order.cost();

        shop.total_sales += order.total_price;
        order_owner.insert(order.id, order.staff_id);

        if visible(order.staff_id) {
            *daily
                .entry(local_date(order.created_at, options.utc_offset))
                .or_default() += order.total_price;
        }
    }

    for payment in input.payments {
        let Some(staff_id) = order_owner.get(&payment.order_id) else {
            continue;
        };
        let collected = payment.collected(options.card_fee);
        if let Some(bucket) = buckets.get_mut(staff_id) {
            bucket.total_collected += collected;
        }
        shop.total_collected += collected;
    }

    let directory: HashMap<i64, &StaffMember> =
        input.staff.iter().map(|member| (member.id, member)).collect();

    let mut staff: Vec<StaffPerformance> = buckets
        .into_iter()
        .filter(|(staff_id, _)| visible(*staff_id))
        .map(|(staff_id, bucket)| {
            let member = directory.get(&staff_id);
            let net_collected = (bucket.total_collected - bucket.total_cost).non_negative();
            let commission_percent = match_tier(input.tiers, bucket.total_sales);

            StaffPerformance {
                id: staff_id,
                display_name: member.map(|m| m.display_name.clone()),
                role: member.map(|m| m.role),
                order_count: bucket.order_count,
                total_sales: bucket.total_sales,
                total_collected: bucket.total_collected,
                total_cost: bucket.total_cost,
                net_collected,
                commission_percent,
                commission_amount: net_collected.percent_of(commission_percent),
            }
        })
        .collect();

    // Buckets come out in id order, so equal sales stay ordered by id
    staff.sort_by(|a, b| b.total_sales.cmp(&a.total_sales));

    if visibility == Visibility::OwnOnly {
        shop = ShopSummary::default();
    }

    SalesSummary {
        staff,
        shop,
        daily_sales: daily
            .into_iter()
            .map(|(date, total_sales)| DailySales { date, total_sales })
            .collect(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
