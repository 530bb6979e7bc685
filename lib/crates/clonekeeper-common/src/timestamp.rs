//! Creation timestamps encoded in tag names.
//!
//! A clone's creation time is stored as the *name* of a tag in the Timestamp
//! category, e.g. `TS_2024-01-01 12:00:00`. Names that do not carry the prefix
//! or whose suffix does not parse under [`TIMESTAMP_FORMAT`] are never treated
//! as timestamps.

use chrono::{NaiveDateTime, Timelike};

/// Prefix carried by every timestamp tag name.
pub const TIMESTAMP_PREFIX: &str = "TS_";

/// `strftime` format of the suffix. Second precision, naive local time.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build the tag name for `at`. Sub-second precision is dropped.
#[must_use]
pub fn encode(at: NaiveDateTime) -> String {
    format!("{TIMESTAMP_PREFIX}{}", at.format(TIMESTAMP_FORMAT))
}

/// Parse a tag name produced by [`encode`].
///
/// Returns `None` for a wrong prefix or an unparsable suffix.
#[must_use]
pub fn parse(name: &str) -> Option<NaiveDateTime> {
    let suffix = name.strip_prefix(TIMESTAMP_PREFIX)?;
    NaiveDateTime::parse_from_str(suffix, TIMESTAMP_FORMAT).ok()
}

/// Cheap prefix check used when scanning the tag list.
#[must_use]
pub fn is_timestamp_tag(name: &str) -> bool {
    name.starts_with(TIMESTAMP_PREFIX)
}

/// Truncate `at` to the precision the tag name can represent.
#[must_use]
pub fn truncate(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}
