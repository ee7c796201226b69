//! model::dates
//!
//! Date field parsing and formatting.
//!
//! Backends send dates as loosely ISO-like strings (`2016-08-27 16:50:13`,
//! `2016/08/27 16:50:13`, RFC 3339). The wall-clock components as written
//! are taken to be UTC; any embedded offset is discarded, not applied.
//! Precision is whole seconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};

/// Naive formats tried after separators are canonicalized to `-`.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Formats carrying an offset that is parsed and then dropped.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse a date string into a UTC instant, dropping fractional seconds.
///
/// Returns `None` when the string is not a recognizable date.
///
/// # Example
///
/// ```
/// use truck::model::dates::parse_date;
///
/// let a = parse_date("2016-08-27 16:50:13").unwrap();
/// let b = parse_date("2016/08/27 16:50:13").unwrap();
/// let c = parse_date("2016-08-27T16:50:13+02:00").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a, c);
/// ```
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    parse_wall_clock(value)
        .and_then(|naive| naive.with_nanosecond(0))
        .map(|naive| naive.and_utc())
}

fn parse_wall_clock(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    let canonical = value.replace('/', "-");

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&canonical, format) {
            return Some(dt.naive_local());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&canonical, format) {
            return Some(naive);
        }
    }

    NaiveDate::parse_from_str(&canonical, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Format a UTC instant for serialization.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
