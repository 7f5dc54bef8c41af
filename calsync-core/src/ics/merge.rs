//! UID-keyed merge of calendar documents.

use std::collections::BTreeMap;

use super::generate::calendar_header;
use super::parse::parse_event_blocks;

/// Overlay `incoming` onto `existing`: same UID, the incoming block wins;
/// UIDs only present in `existing` survive byte-for-byte. Nothing is ever
/// deleted. Output blocks are ordered by UID, so the result is independent
/// of input ordering and stable across repeated merges.
pub fn merge_calendars(existing: &str, incoming: &str, calendar_name: &str) -> String {
    let mut blocks: BTreeMap<String, String> = parse_event_blocks(existing);
    for (uid, block) in parse_event_blocks(incoming) {
        blocks.insert(uid, block);
    }

    let mut lines = calendar_header(calendar_name);
    lines.extend(blocks.into_values());
    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}
