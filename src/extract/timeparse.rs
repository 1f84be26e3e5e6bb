//! Relative post-time normalization
//!
//! Listing sites report post times as "3 days ago" style strings. Those are
//! anchored to the scrape wall-clock time and converted to absolute
//! timestamps. Month and year offsets use calendar arithmetic, not fixed
//! 30/365-day approximations.

use crate::extract::NOT_MENTIONED;
use chrono::{DateTime, Duration, Months, Utc};

/// Normalizes a relative post-time string against an anchor instant.
///
/// Returns `None` for the "Not Mentioned" sentinel and for anything that
/// cannot be parsed; an unreadable post time is a missing field, never an
/// error.
pub fn normalize_relative_time(text: &str, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() || text == NOT_MENTIONED {
        return None;
    }

    let amount: i64 = text.split_whitespace().next()?.parse().ok()?;
    if amount < 0 {
        return None;
    }

    if text.contains("minute") {
        anchor.checked_sub_signed(Duration::minutes(amount))
    } else if text.contains("hour") {
        anchor.checked_sub_signed(Duration::hours(amount))
    } else if text.contains("day") {
        anchor.checked_sub_signed(Duration::days(amount))
    } else if text.contains("week") {
        anchor.checked_sub_signed(Duration::weeks(amount))
    } else if text.contains("month") {
        anchor.checked_sub_months(Months::new(amount as u32))
    } else if text.contains("year") {
        anchor.checked_sub_months(Months::new(amount as u32 * 12))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_minutes_ago() {
        let result = normalize_relative_time("45 minutes ago", anchor()).unwrap();
        assert_eq!(result, anchor() - Duration::minutes(45));
    }

    #[test]
    fn test_hours_ago() {
        let result = normalize_relative_time("2 hours ago", anchor()).unwrap();
        assert_eq!(result, anchor() - Duration::hours(2));
    }

    #[test]
    fn test_days_ago() {
        let result = normalize_relative_time("3 days ago", anchor()).unwrap();
        assert_eq!(result, anchor() - Duration::days(3));
    }

    #[test]
    fn test_singular_unit() {
        let result = normalize_relative_time("1 week ago", anchor()).unwrap();
        assert_eq!(result, anchor() - Duration::weeks(1));
    }

    #[test]
    fn test_month_is_calendar_aware() {
        // One month before March 31 is February 28, not March 3.
        let result = normalize_relative_time("1 month ago", anchor()).unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_years_ago() {
        let result = normalize_relative_time("2 years ago", anchor()).unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2023, 3, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_sentinel_normalizes_to_none() {
        assert_eq!(normalize_relative_time(NOT_MENTIONED, anchor()), None);
    }

    #[test]
    fn test_unparsable_normalizes_to_none() {
        assert_eq!(normalize_relative_time("Reposted recently", anchor()), None);
        assert_eq!(normalize_relative_time("", anchor()), None);
        assert_eq!(normalize_relative_time("3 fortnights ago", anchor()), None);
    }
}
