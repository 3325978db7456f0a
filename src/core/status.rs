//! Expiry status derivation.
//!
//! Dates are handled as plain calendar dates (`NaiveDate`), never as instants, so the
//! number of days left does not depend on the time zone the process runs in.

use crate::{
    entities::ExpiryStatus,
    errors::{Error, Result},
};
use chrono::{Local, NaiveDate};

/// Products expiring within this many days (inclusive) are critical.
pub const CRITICAL_WINDOW_DAYS: i64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Days left before expiry and the status derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReading {
    /// Whole days from today to the expiry date; negative once expired
    pub days_remaining: i64,
    /// Status bucket for `days_remaining`
    pub status: ExpiryStatus,
}

/// Today's date in the local time zone.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses a `YYYY-MM-DD` expiry date. Blank input means "no expiry date".
///
/// # Errors
/// Returns [`Error::InvalidDate`] for anything that is not a valid calendar date.
pub fn parse_expiry_date(value: &str) -> Result<Option<NaiveDate>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(Some)
        .map_err(|_| Error::InvalidDate {
            value: value.to_string(),
        })
}

/// Formats a date the way it is stored and compared.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Maps a day count onto its status bucket.
#[must_use]
pub const fn status_for_days(days_remaining: i64) -> ExpiryStatus {
    if days_remaining < 0 {
        ExpiryStatus::Expired
    } else if days_remaining <= CRITICAL_WINDOW_DAYS {
        ExpiryStatus::Critical
    } else {
        ExpiryStatus::Safe
    }
}

/// Derives the status of an expiry date relative to `today`.
///
/// A missing date is treated as non-perishable: zero days and `Safe`.
#[must_use]
pub fn evaluate(expiry: Option<NaiveDate>, today: NaiveDate) -> StatusReading {
    expiry.map_or(
        StatusReading {
            days_remaining: 0,
            status: ExpiryStatus::Safe,
        },
        |date| {
            let days_remaining = (date - today).num_days();
            StatusReading {
                days_remaining,
                status: status_for_days(days_remaining),
            }
        },
    )
}

/// Parses and evaluates in one step.
pub fn evaluate_str(value: &str, today: NaiveDate) -> Result<StatusReading> {
    parse_expiry_date(value).map(|expiry| evaluate(expiry, today))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fifteen_days_out_is_critical() {
        let today = day(2024, 3, 1);
        let reading = evaluate(Some(today + Duration::days(15)), today);
        assert_eq!(reading.days_remaining, 15);
        assert_eq!(reading.status, ExpiryStatus::Critical);
    }

    #[test]
    fn test_yesterday_is_expired() {
        let today = day(2024, 3, 1);
        let reading = evaluate(Some(day(2024, 2, 29)), today);
        assert_eq!(reading.days_remaining, -1);
        assert_eq!(reading.status, ExpiryStatus::Expired);
    }

    #[test]
    fn test_window_boundaries() {
        let today = day(2024, 1, 1);
        assert_eq!(evaluate(Some(today), today).status, ExpiryStatus::Critical);
        assert_eq!(
            evaluate(Some(today + Duration::days(30)), today).status,
            ExpiryStatus::Critical
        );
        assert_eq!(
            evaluate(Some(today + Duration::days(31)), today).status,
            ExpiryStatus::Safe
        );
    }

    #[test]
    fn test_status_matches_day_count_everywhere() {
        let today = day(2024, 6, 15);
        for offset in -400..=400 {
            let reading = evaluate(Some(today + Duration::days(offset)), today);
            assert_eq!(reading.days_remaining, offset);
            let expected = if offset < 0 {
                ExpiryStatus::Expired
            } else if offset <= 30 {
                ExpiryStatus::Critical
            } else {
                ExpiryStatus::Safe
            };
            assert_eq!(reading.status, expected);
        }
    }

    #[test]
    fn test_missing_date_is_safe() {
        let reading = evaluate_str("", day(2024, 1, 1)).unwrap();
        assert_eq!(reading.days_remaining, 0);
        assert_eq!(reading.status, ExpiryStatus::Safe);

        let reading = evaluate_str("   ", day(2024, 1, 1)).unwrap();
        assert_eq!(reading.status, ExpiryStatus::Safe);
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        for bad in ["31/12/2024", "2024-13-01", "2024-02-30", "tomorrow"] {
            let result = parse_expiry_date(bad);
            assert!(
                matches!(result, Err(Error::InvalidDate { value: _ })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_dates_cross_daylight_saving_cleanly() {
        // Spans both DST transitions in most zones; calendar arithmetic is unaffected.
        let today = day(2024, 3, 1);
        let reading = evaluate(Some(day(2024, 11, 15)), today);
        assert_eq!(reading.days_remaining, 259);
    }

    #[test]
    fn test_format_round_trip() {
        let date = day(2025, 7, 4);
        assert_eq!(format_date(date), "2025-07-04");
        assert_eq!(parse_expiry_date("2025-07-04").unwrap(), Some(date));
    }
}
