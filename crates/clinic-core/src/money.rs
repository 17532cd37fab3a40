//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Commission on 3 orders of 333.33 at 7.5%:                              │
//! │    floats drift by fractions of a satang on every addition              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (satang / cents)                     │
//! │    99999 satang × 750 bps / 10000 = 7500 satang (rounded explicitly)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Clients send and receive amounts in major units (`1250.5` = 1 250.50).
//! Parsing goes through decimal *text*, never through `f64` arithmetic:
//!
//! ```rust
//! use clinic_core::money::Money;
//!
//! let price = Money::parse_decimal("1250.5").unwrap();
//! assert_eq!(price.cents(), 125050);
//!
//! // Arithmetic saturates instead of wrapping
//! let doubled = price + price;
//! assert_eq!(doubled.cents(), 250100);
//! assert_eq!(Money::MAX + price, Money::MAX);
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::types::Rate;

/// Number of fractional digits in the major unit.
const MINOR_DIGITS: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (satang for THB).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative intermediates are legal (collected − cost)
/// - **Saturating arithmetic**: period totals clamp at the i64 bounds
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serde**: major units on the wire, minor units everywhere else
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Order.total_price ──► StaffBucket.total_sales ──► tier lookup         │
/// │                                                                         │
/// │  OrderLine.total × deduct% ──► StaffBucket.total_cost                  │
/// │                                                                         │
/// │  Payment.amount (− card fee) ──► total_collected ──► net ──► commission│
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Largest representable amount.
    pub const MAX: Money = Money(i64::MAX);

    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use clinic_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole major units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Parses decimal text in major units (`"1000"`, `"-12.5"`, `"0.125"`).
    ///
    /// More than two fractional digits round half away from zero.
    /// Returns `None` for anything that is not a plain decimal number.
    ///
    /// ```rust
    /// use clinic_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("12.345").unwrap().cents(), 1235);
    /// assert!(Money::parse_decimal("12,5").is_none());
    /// ```
    pub fn parse_decimal(text: &str) -> Option<Self> {
        parse_fixed_point(text, MINOR_DIGITS).map(Money)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Floors the value at zero.
    ///
    /// ```rust
    /// use clinic_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-550).non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(550).non_negative().cents(), 550);
    /// ```
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Returns `rate` percent of this amount.
    ///
    /// ## Rounding
    /// `amount × bps / 10000`, rounded half away from zero on the minor unit.
    /// i128 intermediate; the result clamps to the `Money` range.
    ///
    /// ## Example
    /// ```rust
    /// use clinic_core::money::Money;
    /// use clinic_core::types::Rate;
    ///
    /// let net = Money::from_major(900);
    /// let commission = net.percent_of(Rate::from_bps(1000)); // 10%
    /// assert_eq!(commission, Money::from_major(90));
    /// ```
    pub fn percent_of(&self, rate: Rate) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        let rounded = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money(i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX }))
    }

    /// Subtracts `rate` percent from this amount.
    ///
    /// Used for the card processing fee:
    /// ```text
    /// Card payment 1000.00, fee 3%
    ///      │
    ///      ▼
    /// less_percentage(3%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Collected: 970.00
    /// ```
    pub fn less_percentage(&self, rate: Rate) -> Money {
        *self - self.percent_of(rate)
    }
}

/// Parses a plain decimal string into an integer scaled by `10^scale`.
///
/// Accepts an optional sign, digits, and an optional fractional part.
/// Digits beyond `scale` round half away from zero. Overflow yields `None`.
pub(crate) fn parse_fixed_point(text: &str, scale: u32) -> Option<i64> {
    let text = text.trim();
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let factor = 10i64.checked_pow(scale)?;
    let mut value: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse::<i64>().ok()?.checked_mul(factor)?
    };

    let frac_digits = frac_part.as_bytes();
    let mut place = factor;
    for digit in frac_digits.iter().take(scale as usize) {
        place /= 10;
        value = value.checked_add(i64::from(digit - b'0') * place)?;
    }
    if let Some(next) = frac_digits.get(scale as usize) {
        if *next >= b'5' {
            value = value.checked_add(1)?;
        }
    }

    Some(if negative { -value } else { value })
}

/// Writes a scaled integer as a JSON number: integral when possible.
pub(crate) fn serialize_scaled<S: Serializer>(value: i64, scale: i64, serializer: S) -> Result<S::Ok, S::Error> {
    if value % scale == 0 {
        serializer.serialize_i64(value / scale)
    } else {
        serializer.serialize_f64(value as f64 / scale as f64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display with thousands separators, e.g. `1,250.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.dollars().unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{}{}.{:02}", sign, grouped, self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_scaled(self.0, 100, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor { scale: MINOR_DIGITS }).map(Money)
    }
}

/// Strict decimal visitor shared by `Money` and `Rate`.
///
/// Accepts JSON numbers and numeric strings; rejects everything else.
/// The lenient zero-default path lives in [`crate::coerce`].
pub(crate) struct DecimalVisitor {
    pub(crate) scale: u32,
}

impl DecimalVisitor {
    fn parse<E: de::Error>(&self, text: &str) -> Result<i64, E> {
        parse_fixed_point(text, self.scale)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Str(text), &"a decimal number"))
    }
}

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        self.parse(&v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        self.parse(&v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        // `{}` prints the shortest text that round-trips, e.g. 1250.5
        self.parse(&format!("{}", v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        self.parse(v)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
