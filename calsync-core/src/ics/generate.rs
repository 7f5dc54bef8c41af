//! Calendar document generation.

use chrono::Utc;
use uuid::Uuid;

use crate::event::Event;
use crate::time;

const PRODID: &str = "-//calsync//EN";

/// Escape free text for a property value. The replacement order matters:
/// backslashes first, then newlines, then the comma-space collapse, then
/// semicolons. `", "` becomes a bare comma; a lone comma passes through.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(", ", ",")
        .replace(';', "\\;")
}

pub(super) fn calendar_header(calendar_name: &str) -> Vec<String> {
    vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        format!("X-WR-CALNAME:{}", escape_text(calendar_name)),
        "X-WR-TIMEZONE:UTC".to_string(),
    ]
}

/// Serialize records into a complete calendar document.
///
/// Records missing a title or either time are skipped; the rest of the
/// batch still encodes. Records without an identifier get a synthesized
/// `evt-<random>` UID, fresh on every call.
pub fn build_calendar(events: &[Event], calendar_name: &str) -> String {
    let mut lines = calendar_header(calendar_name);
    let stamp = time::format_ics_utc(&Utc::now());

    for event in events {
        let (Some(title), Some(start), Some(end)) = (&event.title, event.start, event.end) else {
            tracing::debug!(id = ?event.id, "skipping incomplete event record");
            continue;
        };

        let uid = event
            .id
            .clone()
            .unwrap_or_else(|| format!("evt-{}", Uuid::new_v4().simple()));

        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{uid}"));
        lines.push(format!("DTSTAMP:{stamp}"));
        lines.push(format!("DTSTART:{}", time::format_ics_utc(&start)));
        lines.push(format!("DTEND:{}", time::format_ics_utc(&end)));
        lines.push(format!("SUMMARY:{}", escape_text(title)));
        if let Some(location) = &event.location {
            lines.push(format!("LOCATION:{}", escape_text(location)));
        }
        if let Some(status) = &event.status {
            lines.push(format!("STATUS:{}", escape_text(status)));
        }
        lines.push(format!("DESCRIPTION:{}", escape_text(&event.raw.to_string())));
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}
