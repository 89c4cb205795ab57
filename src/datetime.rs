//! Date/time utilities for mureader.
//!
//! Timestamps are stored as RFC 3339 text. Sub-second precision is kept so a
//! stored timestamp compares equal to the one parsed from the same feed again.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format a UTC timestamp for storage.
pub fn to_db_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Format an optional UTC timestamp for storage.
pub fn to_db_option(dt: Option<&DateTime<Utc>>) -> Option<String> {
    dt.map(to_db_string)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the SQLite `datetime('now')` format
/// (`YYYY-MM-DD HH:MM:SS`, interpreted as UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Describe `dt` relative to `now`, e.g. "3 hours ago" or "in 2 days".
pub fn format_relative(dt: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let delta = dt.signed_duration_since(*now);
    let future = delta.num_seconds() > 0;
    let secs = delta.num_seconds().unsigned_abs();

    let (value, unit) = match secs {
        0..=59 => (secs, "second"),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        86_400..=604_799 => (secs / 86_400, "day"),
        604_800..=2_591_999 => (secs / 604_800, "week"),
        2_592_000..=31_535_999 => (secs / 2_592_000, "month"),
        _ => (secs / 31_536_000, "year"),
    };
    let plural = if value == 1 { "" } else { "s" };

    if future {
        format!("in {value} {unit}{plural}")
    } else {
        format!("{value} {unit}{plural} ago")
    }
}
