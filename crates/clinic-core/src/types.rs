//! # Domain Types
//!
//! Core domain types used throughout the clinic POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │    Payment      │   │ CommissionTier  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  min_sales      │       │
//! │  │  staff_id       │   │  order_id (FK)  │   │  max_sales?     │       │
//! │  │  lines[]        │   │  method         │   │  percent        │       │
//! │  │  total_price    │   │  amount         │   └─────────────────┘       │
//! │  │  status         │   └─────────────────┘                              │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Rate       │   │  OrderStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Active         │   │  Cash           │       │
//! │  │  1000 = 10%     │   │  Cancelled      │   │  Transfer       │       │
//! │  └─────────────────┘   └─────────────────┘   │  CreditCard     │       │
//! │                                              └─────────────────┘       │
//! │  ┌──────────────────────────────────────────────────────────────┐      │
//! │  │ Role: Owner │ Admin │ Manager ║ Sales │ BT │ Dr              │      │
//! │  │       ◄─── managerial ───►     ◄─── operational ───►         │      │
//! │  └──────────────────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are the store's integer keys; staff ids appear directly in
//! role redaction (`userId = 7`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::coerce;
use crate::money::{self, DecimalVisitor, Money};

// =============================================================================
// Rate
// =============================================================================

/// A percentage in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. `1000` bps = 10%, `250` bps = 2.5%.
/// Used for line cost deductions, the card fee and commission tiers.
/// On the wire a rate is the plain percentage number (`10`, `2.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from whole percent.
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Rate(percent * 100)
    }

    /// Parses percentage text (`"10"`, `"2.5"`). Negative values are rejected.
    pub fn parse_percent(text: &str) -> Option<Self> {
        let bps = money::parse_fixed_point(text, 2)?;
        u32::try_from(bps).ok().map(Rate)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        money::serialize_scaled(i64::from(self.0), 100, serializer)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bps = deserializer.deserialize_any(DecimalVisitor { scale: 2 })?;
        u32::try_from(bps)
            .map(Rate)
            .map_err(|_| serde::de::Error::custom("percentage must not be negative"))
    }
}

// =============================================================================
// Role
// =============================================================================

/// Staff roles. Closed set; storage and wire strings are exactly
/// `Owner`, `Admin`, `Manager`, `Sales`, `BT`, `Dr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Sales,
    /// Beauty therapist.
    #[serde(rename = "BT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "BT"))]
    Therapist,
    /// Doctor.
    #[serde(rename = "Dr")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Dr"))]
    Doctor,
}

/// What a role may see in sales reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Every staff bucket and the true shop totals.
    Shop,
    /// Only the requester's own bucket; shop totals zeroed.
    OwnOnly,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Owner,
        Role::Admin,
        Role::Manager,
        Role::Sales,
        Role::Therapist,
        Role::Doctor,
    ];

    /// Storage/wire string for this role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Sales => "Sales",
            Role::Therapist => "BT",
            Role::Doctor => "Dr",
        }
    }

    /// Parses a storage/wire string.
    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == value)
    }

    /// Operational (non-managerial) roles: Sales, BT, Dr.
    pub const fn is_operational(&self) -> bool {
        match self {
            Role::Owner | Role::Admin | Role::Manager => false,
            Role::Sales | Role::Therapist | Role::Doctor => true,
        }
    }

    /// Report visibility for this role.
    pub const fn report_visibility(&self) -> Visibility {
        if self.is_operational() {
            Visibility::OwnOnly
        } else {
            Visibility::Shop
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order. `Active` → `Cancelled` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum OrderStatus {
    #[default]
    Active,
    Cancelled,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a payment was received. Only `CreditCard` carries the processing fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(alias = "Cash")]
    Cash,
    /// Bank transfer. Also the checkout default (`Transfer/Cash`).
    #[serde(alias = "Transfer", alias = "Transfer/Cash")]
    Transfer,
    #[serde(alias = "CreditCard", alias = "Credit Card", alias = "card")]
    CreditCard,
}

impl PaymentMethod {
    /// Whether the card processing fee applies.
    #[inline]
    pub const fn incurs_card_fee(&self) -> bool {
        matches!(self, PaymentMethod::CreditCard)
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Transfer
    }
}

// =============================================================================
// Appointment Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Cancelled,
}

// =============================================================================
// Staff
// =============================================================================

/// A staff account as seen by the rest of the system (no credentials).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

// =============================================================================
// Order Line
// =============================================================================

/// One line of an order, decoded leniently from the stored item JSON.
///
/// Lines are stored exactly as the checkout screen submitted them, so any
/// field may be missing or non-numeric. Those read as zero here; see
/// [`coerce`] for the single zero-default rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub name: Option<String>,
    pub price: Money,
    pub total: Money,
    pub deduct_percent: Rate,
}

impl OrderLine {
    /// Decodes a single stored line.
    pub fn from_value(value: &serde_json::Value) -> Self {
        OrderLine {
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            price: coerce::money_or_zero(value.get("price")),
            total: coerce::money_or_zero(value.get("total")),
            deduct_percent: coerce::rate_or_zero(value.get("deduct_percent")),
        }
    }

    /// Attributable product cost: `total × deduct_percent / 100`.
    #[inline]
    pub fn cost(&self) -> Money {
        self.total.percent_of(self.deduct_percent)
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order as consumed by the sales aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    /// Responsible (sale) staff member.
    pub staff_id: i64,
    pub lines: Vec<OrderLine>,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
}

impl Order {
    /// Sum of line-level cost deductions.
    pub fn cost(&self) -> Money {
        self.lines.iter().map(OrderLine::cost).sum()
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards an order. Append-only; many per order (installments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: Money,
    pub method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Amount that counts as collected after the card fee.
    pub fn collected(&self, card_fee: Rate) -> Money {
        if self.method.incurs_card_fee() {
            self.amount.less_percentage(card_fee)
        } else {
            self.amount
        }
    }
}

// =============================================================================
// Commission Tier
// =============================================================================

/// A commission bracket keyed by a staff member's total sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CommissionTier {
    #[serde(default)]
    pub id: i64,
    /// Inclusive lower bound.
    pub min_sales: Money,
    /// Inclusive upper bound; open-ended when absent.
    #[serde(default)]
    pub max_sales: Option<Money>,
    pub percent: Rate,
}

impl CommissionTier {
    /// `min <= sales` and (`max` absent or `sales <= max`).
    pub fn contains(&self, sales: Money) -> bool {
        sales >= self.min_sales && self.max_sales.map_or(true, |max| sales <= max)
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub age: Option<i64>,
    pub disease: Option<String>,
    pub pdpa_consent: bool,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

// =============================================================================
// System Settings
// =============================================================================

/// The single settings row: chat alerts and the card fee.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    #[serde(default, alias = "tg_token")]
    pub tg_token: Option<String>,
    #[serde(default, alias = "tg_chat_id")]
    pub tg_chat_id: Option<String>,
    #[serde(default, alias = "alert_new_order")]
    pub alert_new_order: bool,
    #[serde(default, alias = "card_fee_percent")]
    pub card_fee_percent: Rate,
}

impl SystemSettings {
    /// Token and chat id when new-order alerts are switched on and configured.
    pub fn new_order_alert_target(&self) -> Option<(&str, &str)> {
        if !self.alert_new_order {
            return None;
        }
        let token = self.tg_token.as_deref().filter(|t| !t.trim().is_empty())?;
        let chat = self.tg_chat_id.as_deref().filter(|c| !c.trim().is_empty())?;
        Some((token, chat))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rate_from_bps() {
        let rate = Rate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
        assert_eq!(rate.to_string(), "8.25%");
    }

    #[test]
    fn test_rate_parse_percent() {
        assert_eq!(Rate::parse_percent("10"), Some(Rate::from_bps(1000)));
        assert_eq!(Rate::parse_percent("2.5"), Some(Rate::from_bps(250)));
        assert_eq!(Rate::parse_percent("-1"), None);
        assert_eq!(Rate::parse_percent("ten"), None);
    }

    #[test]
    fn test_rate_serde() {
        assert_eq!(serde_json::to_value(Rate::from_percent(10)).unwrap(), json!(10));
        let rate: Rate = serde_json::from_value(json!(2.5)).unwrap();
        assert_eq!(rate.bps(), 250);
        assert!(serde_json::from_value::<Rate>(json!(-3)).is_err());
    }

    #[test]
    fn test_role_strings() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
            let wire = serde_json::to_value(role).unwrap();
            assert_eq!(wire, json!(role.as_str()));
        }
        assert_eq!(Role::parse("BT"), Some(Role::Therapist));
        assert_eq!(Role::parse("Cashier"), None);
    }

    #[test]
    fn test_role_visibility() {
        assert_eq!(Role::Owner.report_visibility(), Visibility::Shop);
        assert_eq!(Role::Admin.report_visibility(), Visibility::Shop);
        assert_eq!(Role::Manager.report_visibility(), Visibility::Shop);
        assert_eq!(Role::Sales.report_visibility(), Visibility::OwnOnly);
        assert_eq!(Role::Therapist.report_visibility(), Visibility::OwnOnly);
        assert_eq!(Role::Doctor.report_visibility(), Visibility::OwnOnly);
    }

    #[test]
    fn test_payment_method_aliases() {
        let m: PaymentMethod = serde_json::from_value(json!("Transfer/Cash")).unwrap();
        assert_eq!(m, PaymentMethod::Transfer);
        let m: PaymentMethod = serde_json::from_value(json!("credit_card")).unwrap();
        assert!(m.incurs_card_fee());
        let m: PaymentMethod = serde_json::from_value(json!("Cash")).unwrap();
        assert!(!m.incurs_card_fee());
    }

    #[test]
    fn test_order_line_lenient_decode() {
        let line = OrderLine::from_value(&json!({
            "name": "Botox 50u",
            "price": 1000,
            "total": "1000",
            "deduct_percent": 10
        }));
        assert_eq!(line.name.as_deref(), Some("Botox 50u"));
        assert_eq!(line.total, Money::from_major(1000));
        assert_eq!(line.cost(), Money::from_major(100));

        let broken = OrderLine::from_value(&json!({ "total": "n/a" }));
        assert!(broken.cost().is_zero());
        assert!(broken.name.is_none());
    }

    #[test]
    fn test_payment_collected_applies_card_fee_only() {
        let mut payment = Payment {
            id: 1,
            order_id: 1,
            amount: Money::from_major(1000),
            method: PaymentMethod::CreditCard,
            created_at: Utc::now(),
        };
        assert_eq!(payment.collected(Rate::from_percent(3)), Money::from_major(970));

        payment.method = PaymentMethod::Cash;
        assert_eq!(payment.collected(Rate::from_percent(3)), Money::from_major(1000));
    }

    #[test]
    fn test_tier_contains() {
        let tier = CommissionTier {
            id: 1,
            min_sales: Money::zero(),
            max_sales: Some(Money::from_major(999)),
            percent: Rate::from_percent(5),
        };
        assert!(tier.contains(Money::zero()));
        assert!(tier.contains(Money::from_major(999)));
        assert!(!tier.contains(Money::from_major(1000)));

        let open = CommissionTier { max_sales: None, ..tier };
        assert!(open.contains(Money::from_major(1_000_000)));
    }

    #[test]
    fn test_alert_target_requires_flag_and_credentials() {
        let mut settings = SystemSettings {
            tg_token: Some("token".into()),
            tg_chat_id: Some("42".into()),
            alert_new_order: false,
            card_fee_percent: Rate::zero(),
        };
        assert!(settings.new_order_alert_target().is_none());

        settings.alert_new_order = true;
        assert_eq!(settings.new_order_alert_target(), Some(("token", "42")));

        settings.tg_chat_id = Some("  ".into());
        assert!(settings.new_order_alert_target().is_none());
    }
}
