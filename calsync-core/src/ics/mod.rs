//! Calendar document generation, parsing, and UID-keyed merging.
//!
//! This codec speaks the exact dialect the remote store already contains:
//! the escaping and unfolding rules are wire-compatible with existing
//! documents, not a general-purpose RFC 5545 implementation. Changing them
//! would corrupt round-trips against deployed calendars.

mod generate;
mod merge;
mod parse;

pub use generate::{build_calendar, escape_text};
pub use merge::merge_calendars;
pub use parse::parse_event_blocks;
