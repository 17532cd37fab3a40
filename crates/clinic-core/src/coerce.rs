//! # Lenient Numeric Coercion
//!
//! The one place where malformed numbers become zero.
//!
//! Order lines are stored exactly as the checkout screen sent them, so a
//! `total` may be `1000`, `"1000"`, `"1,000"`, `null`, or missing entirely.
//! Reports must not fail because of one sloppy line, so everything that
//! reads client-shaped numbers goes through here:
//!
//! ```text
//! JSON value ──► decimal text? ──► Money / Rate
//!                    │ no
//!                    ▼
//!                  zero
//! ```
//!
//! Strict parsing (reject instead of zero) is the `Deserialize` impls on
//! [`Money`] and [`Rate`]; use those for request payloads.

use serde_json::Value;

use crate::money::Money;
use crate::types::{OrderLine, Rate};

/// Decimal text for a JSON number or numeric-looking string.
fn decimal_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Reads a major-unit amount, defaulting to zero.
///
/// ```rust
/// use clinic_core::coerce::money_or_zero;
/// use serde_json::json;
///
/// assert_eq!(money_or_zero(Some(&json!("12.5"))).cents(), 1250);
/// assert!(money_or_zero(Some(&json!("twelve"))).is_zero());
/// assert!(money_or_zero(None).is_zero());
/// ```
pub fn money_or_zero(value: Option<&Value>) -> Money {
    decimal_text(value)
        .and_then(|text| Money::parse_decimal(&text))
        .unwrap_or_default()
}

/// Reads a percentage, defaulting to zero. Negative percentages read as zero.
pub fn rate_or_zero(value: Option<&Value>) -> Rate {
    decimal_text(value)
        .and_then(|text| Rate::parse_percent(&text))
        .unwrap_or_default()
}

/// Decodes a stored item list. Anything other than an array has no lines.
pub fn order_lines(items: &Value) -> Vec<OrderLine> {
    match items {
        Value::Array(lines) => lines.iter().map(OrderLine::from_value).collect(),
        _ => Vec::new(),
    }
}

/// Decodes stored item JSON text. Unparsable text has no lines.
pub fn order_lines_from_str(items_json: &str) -> Vec<OrderLine> {
    serde_json::from_str::<Value>(items_json)
        .map(|items| order_lines(&items))
        .unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================
