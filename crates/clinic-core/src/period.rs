//! # Reporting Periods
//!
//! Calendar-day ranges and their conversion to timestamp bounds.
//!
//! Reports are asked for in calendar days of the clinic's own time zone,
//! while timestamps are stored in UTC:
//!
//! ```text
//!  startDate 2025-03-01          endDate 2025-03-31      (UTC+7)
//!      │                               │
//!      ▼                               ▼
//!  2025-02-28T17:00:00Z  ≤  created_at  <  2025-03-31T17:00:00Z
//! ```
//!
//! The upper bound is the *start of the day after* `end`, so the whole of
//! the last day is included without an `23:59:59` approximation.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::error::{CoreError, CoreResult, ValidationError};

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(rename = "startDate")]
    start: NaiveDate,
    #[serde(rename = "endDate")]
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::InvalidPeriod {
                reason: format!("start {} is after end {}", start, end),
            });
        }
        Ok(DateRange { start, end })
    }

    /// Parses two canonical `YYYY-MM-DD` strings.
    ///
    /// ```rust
    /// use clinic_core::period::DateRange;
    ///
    /// let range = DateRange::parse("2025-03-01", "2025-03-15").unwrap();
    /// assert_eq!(range.days(), 15);
    /// assert!(DateRange::parse("2025-03-15", "2025-03-01").is_err());
    /// ```
    pub fn parse(start: &str, end: &str) -> CoreResult<Self> {
        let start = parse_day("startDate", start)?;
        let end = parse_day("endDate", end)?;
        DateRange::new(start, end)
    }

    /// The whole calendar month for a `YYYY-MM` string.
    ///
    /// ```rust
    /// use clinic_core::period::DateRange;
    ///
    /// let feb = DateRange::month("2024-02").unwrap();
    /// assert_eq!(feb.end().to_string(), "2024-02-29");
    /// ```
    pub fn month(text: &str) -> CoreResult<Self> {
        let text = text.trim();
        let invalid = || ValidationError::InvalidFormat {
            field: "month".to_string(),
            reason: "expected YYYY-MM".to_string(),
        };

        if text.len() != 7 {
            return Err(invalid().into());
        }
        let first = NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d").map_err(|_| invalid())?;
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid)?;

        DateRange::new(first, last)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered (inclusive).
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// `[start-of-start, start-of-day-after-end)` in UTC for the given zone.
    pub fn utc_bounds(&self, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        let after_end = self.end.succ_opt().unwrap_or(self.end);
        (
            start_of_day_utc(self.start, offset),
            start_of_day_utc(after_end, offset),
        )
    }
}

/// Calendar day of a UTC timestamp in the business time zone.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Builds a `FixedOffset` from minutes east of UTC.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

fn start_of_day_utc(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local: NaiveDateTime = day.and_time(NaiveTime::default());
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc)
}

fn parse_day(field: &str, text: &str) -> CoreResult<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        // `%Y` accepts signed/long years; only canonical dates are allowed
        .filter(|day| text.len() == 10 && day.year() >= 1)
        .ok_or_else(|| {
            ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "expected YYYY-MM-DD".to_string(),
            }
            .into()
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bangkok() -> FixedOffset {
        offset_from_minutes(7 * 60).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        let march = DateRange::month("2025-03").unwrap();
        assert_eq!(march.start().to_string(), "2025-03-01");
        assert_eq!(march.end().to_string(), "2025-03-31");
        assert_eq!(march.days(), 31);

        let april = DateRange::month("2025-04").unwrap();
        assert_eq!(april.end().to_string(), "2025-04-30");

        let december = DateRange::month("2025-12").unwrap();
        assert_eq!(december.end().to_string(), "2025-12-31");
    }

    #[test]
    fn test_month_rejects_malformed() {
        assert!(DateRange::month("2025-13").is_err());
        assert!(DateRange::month("2025-3").is_err());
        assert!(DateRange::month("March").is_err());
        assert!(DateRange::month("").is_err());
    }

    #[test]
    fn test_parse_days() {
        let range = DateRange::parse("2025-01-10", "2025-01-10").unwrap();
        assert_eq!(range.days(), 1);

        assert!(DateRange::parse("2025-1-10", "2025-01-11").is_err());
        assert!(DateRange::parse("2025-01-10", "tomorrow").is_err());
        assert!(matches!(
            DateRange::parse("2025-02-01", "2025-01-01"),
            Err(CoreError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_utc_bounds_cover_whole_local_days() {
        let range = DateRange::parse("2025-03-01", "2025-03-31").unwrap();
        let (from, until) = range.utc_bounds(bangkok());

        assert_eq!(from, Utc.with_ymd_and_hms(2025, 2, 28, 17, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2025, 3, 31, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_local_date_uses_business_zone() {
        // 23:30 local on March 1st is 16:30Z
        let late_evening = Utc.with_ymd_and_hms(2025, 3, 1, 16, 30, 0).unwrap();
        assert_eq!(local_date(late_evening, bangkok()), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        // 00:30 local on March 2nd is 17:30Z on March 1st
        let after_midnight = Utc.with_ymd_and_hms(2025, 3, 1, 17, 30, 0).unwrap();
        assert_eq!(local_date(after_midnight, bangkok()), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
    }

    #[test]
    fn test_serializes_canonical_dates() {
        let range = DateRange::month("2025-02").unwrap();
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json["startDate"], "2025-02-01");
        assert_eq!(json["endDate"], "2025-02-28");
    }
}
