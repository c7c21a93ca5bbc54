//! Legacy timestamp helpers
//!
//! The zone and schedule state files predate this daemon and store local
//! times as `YYYY-MM-DD HH:MM:SS` with an optional `.ffffff` fraction.
//! New writes always include the fraction; reads accept both.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Timestamp layout written to the state files.
const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Timestamp layout accepted when reading (`%.f` matches an optional fraction).
const READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Get the current local time.
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Format a local time in the state-file layout.
pub fn format_timestamp(dt: &DateTime<Local>) -> String {
    dt.format(WRITE_FORMAT).to_string()
}

/// Parse a state-file timestamp, with or without the fractional part.
///
/// Returns `None` for the empty string (a fresh zone block) and for
/// anything that does not parse.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    if s.is_empty() {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(s, READ_FORMAT).ok()?;

    // An ambiguous local time (DST fold) resolves to the earlier instant.
    Local.from_local_datetime(&naive).earliest()
}
