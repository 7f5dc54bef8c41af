//! Calendar event records.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::time;

/// One event as fetched from the upstream portal or the parsing service.
///
/// Fields are optional because source payloads are: a record missing its
/// title or either time is carried along and dropped at encode time rather
/// than aborting the batch. `raw` keeps the source object verbatim; it ends
/// up as the DESCRIPTION payload of the generated block.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: Option<String>,
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub raw: Value,
}

impl Event {
    /// Build a record from an upstream event-list entry. Times are local
    /// wall-clock strings like `2024-03-20 15:00`.
    pub fn from_upstream(value: &Value) -> Self {
        Self {
            id: id_field(value, "eventId").or_else(|| id_field(value, "id")),
            title: text_field(value, "title"),
            start: upstream_time_field(value, "startTime"),
            end: upstream_time_field(value, "endTime"),
            location: text_field(value, "location"),
            status: text_field(value, "status"),
            raw: value.clone(),
        }
    }

    /// Build a record from a parsing-service event. Times are fixed-offset
    /// strings like `20240320T150000+0800`.
    pub fn from_parsed(value: &Value) -> Self {
        Self {
            id: id_field(value, "eventId").or_else(|| id_field(value, "id")),
            title: text_field(value, "title"),
            start: text_field(value, "startTime").and_then(|s| time::parse_offset_time(&s)),
            end: text_field(value, "endTime").and_then(|s| time::parse_offset_time(&s)),
            location: text_field(value, "location"),
            status: text_field(value, "status"),
            raw: value.clone(),
        }
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// Identifiers sometimes arrive as numbers.
fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn upstream_time_field(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = text_field(value, key)?;
    let parsed = time::parse_upstream_time(&raw);
    if parsed.is_none() {
        tracing::warn!(field = key, value = %raw, "unparsable event time, record will be dropped");
    }
    parsed
}
