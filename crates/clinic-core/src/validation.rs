//! # Validation Module
//!
//! Input validation for request payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request decoding (serde)                                     │
//! │  ├── Types and required fields                                         │
//! │  └── Strict Money / Rate parsing                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, formats, ranges                                          │
//! │  └── Commission tier consistency                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (username, customer phone)                                 │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lengths count characters, not bytes, so Thai names are measured the way
//! staff type them.
//!
//! ## Usage
//! ```rust
//! use clinic_core::validation::{validate_pin, validate_username};
//!
//! assert_eq!(validate_username("  nurse.aom ").unwrap(), "nurse.aom");
//! assert!(validate_pin("1234").is_ok());
//! ```

use chrono::{NaiveDate, NaiveTime};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CommissionTier, Rate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted search query.
pub const MAX_QUERY_LEN: usize = 100;

/// Largest accepted amount, in major units.
pub const MAX_AMOUNT_MAJOR: i64 = 1_000_000_000_000;

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a login name.
///
/// ## Rules
/// - Required, at most 50 characters
/// - Letters, digits, `.`, `_` and `-` only
///
/// ## Returns
/// The trimmed username.
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = required_text("username", username, 50)?;

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(username)
}

/// Validates a staff PIN: 4 to 12 ASCII digits.
///
/// ```rust
/// use clinic_core::validation::validate_pin;
///
/// assert!(validate_pin("0000").is_ok());
/// assert!(validate_pin("12a4").is_err());
/// assert!(validate_pin("123").is_err());
/// ```
pub fn validate_pin(pin: &str) -> ValidationResult<()> {
    if pin.is_empty() {
        return Err(ValidationError::Required {
            field: "pin".to_string(),
        });
    }

    if !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "pin".to_string(),
            reason: "must contain digits only".to_string(),
        });
    }

    if pin.len() < 4 {
        return Err(ValidationError::TooShort {
            field: "pin".to_string(),
            min: 4,
        });
    }

    if pin.len() > 12 {
        return Err(ValidationError::TooLong {
            field: "pin".to_string(),
            max: 12,
        });
    }

    Ok(())
}

/// Validates a staff display name (required, at most 100 characters).
pub fn validate_display_name(name: &str) -> ValidationResult<String> {
    required_text("name", name, 100)
}

/// Validates a required person-name field such as `firstName`.
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<String> {
    required_text(field, name, 100)
}

/// Validates a customer phone number.
///
/// ## Rules
/// - Required, at most 20 characters
/// - Digits, spaces, `-` and a leading `+`
/// - At least 6 digits
///
/// ## Returns
/// The trimmed phone exactly as typed; customers are matched on it.
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = required_text("phone", phone, 20)?;

    let allowed = phone.char_indices().all(|(i, c)| {
        c.is_ascii_digit() || c == ' ' || c == '-' || (c == '+' && i == 0)
    });
    if !allowed {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, hyphens and a leading +".to_string(),
        });
    }

    if phone.chars().filter(char::is_ascii_digit).count() < 6 {
        return Err(ValidationError::TooShort {
            field: "phone".to_string(),
            min: 6,
        });
    }

    Ok(phone)
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (lists every customer, up to the limit)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

/// Validates free-text details (appointment or service notes).
pub fn validate_details(details: &str) -> ValidationResult<String> {
    required_text("details", details, 1000)
}

// =============================================================================
// Date & Time Validators
// =============================================================================

/// Parses a canonical `YYYY-MM-DD` date.
pub fn validate_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    let value = value.trim();
    let invalid = || ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "expected YYYY-MM-DD".to_string(),
    };

    if value.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}

/// Parses a wall-clock time, `HH:MM` or `HH:MM:SS`.
pub fn validate_time(field: &str, value: &str) -> ValidationResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected HH:MM".to_string(),
        })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an optional customer age (0 to 150).
pub fn validate_age(age: Option<i64>) -> ValidationResult<()> {
    match age {
        Some(age) if !(0..=150).contains(&age) => Err(ValidationError::OutOfRange {
            field: "age".to_string(),
            min: 0,
            max: 150,
        }),
        _ => Ok(()),
    }
}

/// Validates an amount that may be zero but not negative (order totals),
/// capped at [`MAX_AMOUNT_MAJOR`].
///
/// ## Example
/// ```rust
/// use clinic_core::money::Money;
/// use clinic_core::validation::validate_price;
///
/// assert!(validate_price("totalPrice", Money::from_major(0)).is_ok());
/// assert!(validate_price("totalPrice", Money::from_cents(-100)).is_err());
/// assert!(validate_price("totalPrice", Money::from_major(1_000_000_000_001)).is_err());
/// ```
pub fn validate_price(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() || amount > Money::from_major(MAX_AMOUNT_MAJOR) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_MAJOR,
        });
    }

    Ok(())
}

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Cannot pay zero or negative amounts
/// - At most [`MAX_AMOUNT_MAJOR`]
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    validate_price("amount", amount)
}

/// Validates a percentage: 0% to 100%.
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate.bps() > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Commission Tiers
// =============================================================================

/// Validates a complete tier table before it replaces the stored one.
///
/// ## Rules
/// - `minSales` is not negative, and neither bound exceeds [`MAX_AMOUNT_MAJOR`]
/// - `maxSales`, when present, is not below `minSales`
/// - `percent` is at most 100
///
/// Overlaps are allowed; the aggregator resolves them by last match.
/// Errors name the offending tier, e.g. `tiers[1].maxSales`.
pub fn validate_commission_tiers(tiers: &[CommissionTier]) -> ValidationResult<()> {
    for (index, tier) in tiers.iter().enumerate() {
        validate_price(&format!("tiers[{}].minSales", index), tier.min_sales)?;

        if let Some(max) = tier.max_sales {
            validate_price(&format!("tiers[{}].maxSales", index), max)?;
            if max < tier.min_sales {
                return Err(ValidationError::InvalidFormat {
                    field: format!("tiers[{}].maxSales", index),
                    reason: "must not be below minSales".to_string(),
                });
            }
        }

        validate_rate(&format!("tiers[{}].percent", index), tier.percent)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username(" admin ").unwrap(), "admin");
        assert!(validate_username("dr.chai_01").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_pin() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("123456789012").is_ok());

        assert!(matches!(validate_pin(""), Err(ValidationError::Required { .. })));
        assert!(matches!(validate_pin("12"), Err(ValidationError::TooShort { .. })));
        assert!(matches!(
            validate_pin("1234567890123"),
            Err(ValidationError::TooLong { .. })
        ));
        assert!(matches!(
            validate_pin("12 34"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_names_count_characters() {
        // 100 Thai characters is fine even though it is 300 bytes
        assert!(validate_person_name("firstName", &"ก".repeat(100)).is_ok());
        assert!(validate_person_name("firstName", &"ก".repeat(101)).is_err());
        assert!(validate_display_name("  ").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone(" 081-234-5678 ").unwrap(), "081-234-5678");
        assert!(validate_phone("+66 81 234 5678").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("08x2345678").is_err());
        assert!(validate_phone("081+2345678").is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  somchai ").unwrap(), "somchai");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_date_and_time() {
        assert!(validate_date("date", "2025-03-01").is_ok());
        assert!(validate_date("date", "2025-3-1").is_err());
        assert!(validate_date("date", "2025-02-30").is_err());

        assert_eq!(
            validate_time("time", "14:30").unwrap(),
            NaiveTime::from_hms_opt(14, 30, 0).unwrap()
        );
        assert!(validate_time("time", "14:30:15").is_ok());
        assert!(validate_time("time", "25:00").is_err());
    }

    #[test]
    fn test_validate_age() {
        assert!(validate_age(None).is_ok());
        assert!(validate_age(Some(35)).is_ok());
        assert!(validate_age(Some(-1)).is_err());
        assert!(validate_age(Some(151)).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price("totalPrice", Money::zero()).is_ok());
        assert!(validate_price("totalPrice", Money::from_cents(-1)).is_err());
        assert!(validate_price("totalPrice", Money::from_major(MAX_AMOUNT_MAJOR)).is_ok());
        assert!(validate_price("totalPrice", Money::from_major(MAX_AMOUNT_MAJOR) + Money::from_cents(1)).is_err());
        assert!(validate_price("totalPrice", Money::parse_decimal("50000000000000000").unwrap()).is_err());

        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_cents(-500)).is_err());
        assert!(validate_payment_amount(Money::from_major(MAX_AMOUNT_MAJOR + 1)).is_err());
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate("cardFeePercent", Rate::from_percent(3)).is_ok());
        assert!(validate_rate("cardFeePercent", Rate::from_bps(10_000)).is_ok());
        assert!(validate_rate("cardFeePercent", Rate::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_commission_tiers() {
        let tier = |min: i64, max: Option<i64>, pct: u32| CommissionTier {
            id: 0,
            min_sales: Money::from_major(min),
            max_sales: max.map(Money::from_major),
            percent: Rate::from_percent(pct),
        };

        assert!(validate_commission_tiers(&[]).is_ok());
        assert!(validate_commission_tiers(&[tier(0, Some(999), 5), tier(1000, None, 10)]).is_ok());

        let err = validate_commission_tiers(&[tier(0, None, 5), tier(1000, Some(500), 10)])
            .unwrap_err();
        assert!(err.to_string().starts_with("tiers[1].maxSales"));

        let err = validate_commission_tiers(&[tier(-1, None, 5)]).unwrap_err();
        assert!(err.to_string().starts_with("tiers[0].minSales"));

        let err = validate_commission_tiers(&[tier(0, Some(MAX_AMOUNT_MAJOR + 1), 5)]).unwrap_err();
        assert!(err.to_string().starts_with("tiers[0].maxSales"));

        let err = validate_commission_tiers(&[tier(0, None, 101)]).unwrap_err();
        assert!(err.to_string().starts_with("tiers[0].percent"));
    }
}
