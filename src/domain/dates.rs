// Date parsing for listing blurbs and relative "last read" formatting

use chrono::{DateTime, Datelike, NaiveDate, Utc};

const DATE_FORMATS: &[&str] = &["%d %b %Y", "%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

/// Parse the date shapes found in listing markup and stored metadata.
/// Date-only values resolve to midnight UTC.
pub fn parse_listing_date(raw: &str) -> Option<DateTime<Utc>> {
    let mut text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(prefix) = text.get(..13) {
        if prefix.eq_ignore_ascii_case("last updated:") {
            text = text[13..].trim_start();
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Human relative form of `then` as seen from `now`.
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;
    let weeks = days / 7;
    let months = days / 30;
    let years = days / 365;

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("{n} {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };

    if secs < 60 {
        "Just now".to_string()
    } else if mins < 60 {
        plural(mins, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else if weeks < 4 {
        plural(weeks, "week")
    } else if months < 12 {
        plural(months, "month")
    } else if years < 2 {
        "1 year ago".to_string()
    } else {
        format!("{} {}, {}", then.format("%b"), then.day(), then.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn parses_blurb_and_iso_dates() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_listing_date("15 Jan 2025"), Some(expected));
        assert_eq!(parse_listing_date("2025-01-15"), Some(expected));
        assert_eq!(parse_listing_date("Last updated: January 15, 2025"), Some(expected));
        assert_eq!(
            parse_listing_date("2025-01-15T08:30:00Z"),
            Some(Utc.with_ymd_and_hms(2025, 1, 15, 8, 30, 0).unwrap())
        );
        assert_eq!(parse_listing_date("yesterday-ish"), None);
        assert_eq!(parse_listing_date("   "), None);
    }

    #[test]
    fn relative_formatting_steps() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(format_relative(now - Duration::seconds(30), now), "Just now");
        assert_eq!(format_relative(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_relative(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_relative(now - Duration::days(3), now), "3 days ago");
        assert_eq!(format_relative(now - Duration::days(14), now), "2 weeks ago");
        assert_eq!(format_relative(now - Duration::days(90), now), "3 months ago");
        assert_eq!(format_relative(now - Duration::days(400), now), "1 year ago");
        let old = Utc.with_ymd_and_hms(2020, 3, 7, 0, 0, 0).unwrap();
        assert_eq!(format_relative(old, now), "Mar 7, 2020");
    }
}
