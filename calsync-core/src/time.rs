//! Timestamp parsing and formatting for the wire formats we speak.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Render an instant in the basic UTC form used in calendar documents,
/// e.g. `20240320T150000Z`.
pub fn format_ics_utc(t: &DateTime<Utc>) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Render a date the way the upstream event-list API expects,
/// e.g. `2024-03-20+00:00`.
pub fn format_api_date(d: NaiveDate) -> String {
    format!("{}+00:00", d.format("%Y-%m-%d"))
}

/// Parse an upstream event time (`YYYY-MM-DD HH:MM`, local wall clock)
/// into UTC. Trailing seconds or other junk after the minute are ignored,
/// matching how lenient the upstream payloads are.
pub fn parse_upstream_time(s: &str) -> Option<DateTime<Utc>> {
    let prefix = s.get(..16)?;
    let naive = NaiveDateTime::parse_from_str(prefix, "%Y-%m-%d %H:%M").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Parse a parsing-service timestamp (`YYYYMMDDTHHMMSS±HHMM`) into UTC.
/// The offset must be a signed four-digit value; `Z` and colon forms are
/// outside the contract and rejected.
pub fn parse_offset_time(s: &str) -> Option<DateTime<Utc>> {
    let bytes = s.as_bytes();
    if bytes.len() != 20 || !matches!(bytes[15], b'+' | b'-') {
        return None;
    }
    DateTime::parse_from_str(s, "%Y%m%dT%H%M%S%z")
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
