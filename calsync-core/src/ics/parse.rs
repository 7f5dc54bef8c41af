//! Calendar document parsing.

use std::collections::BTreeMap;

// Folded continuation lines (leading space or tab) are glued onto the
// previous physical line, minus the one marker character, before any
// property is read.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let continuation = line
            .strip_prefix(' ')
            .or_else(|| line.strip_prefix('\t'));
        match (continuation, lines.last_mut()) {
            (Some(rest), Some(previous)) => previous.push_str(rest),
            _ => lines.push(line.to_string()),
        }
    }
    lines
}

// A UID property line: `UID` case-insensitively, followed by `:` or `;`.
// The value is everything after the first colon, trimmed.
fn uid_value(line: &str) -> Option<String> {
    let bytes = line.as_bytes();
    if bytes.len() < 4
        || !bytes[..3].eq_ignore_ascii_case(b"UID")
        || !matches!(bytes[3], b':' | b';')
    {
        return None;
    }
    let value = match line.find(':') {
        Some(idx) => &line[idx + 1..],
        None => line,
    };
    Some(value.trim().to_string())
}

/// Extract event blocks keyed by UID.
///
/// Total over arbitrary input: anything that is not a well-formed event
/// block is dropped, never an error. Blocks keep their raw text from
/// `BEGIN:VEVENT` through `END:VEVENT` inclusive; a later block with the
/// same UID replaces the earlier one.
pub fn parse_event_blocks(text: &str) -> BTreeMap<String, String> {
    let mut blocks = BTreeMap::new();
    let mut in_event = false;
    let mut buffer: Vec<String> = Vec::new();
    let mut uid: Option<String> = None;

    for line in logical_lines(text) {
        if line == "BEGIN:VEVENT" {
            in_event = true;
            buffer = vec![line];
            uid = None;
            continue;
        }
        if line == "END:VEVENT" {
            buffer.push(line);
            if let Some(uid) = uid.take() {
                blocks.insert(uid, buffer.join("\r\n"));
            }
            in_event = false;
            buffer = Vec::new();
            continue;
        }
        if in_event {
            if uid.is_none() {
                uid = uid_value(&line);
            }
            buffer.push(line);
        }
    }

    blocks
}
