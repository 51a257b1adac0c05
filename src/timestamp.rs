//! Bid and rate timestamp handling.
//!
//! Feeds encode timestamps as `HH-DD-MM-YYYY` (hour, day, month, year). The
//! fields are read by name through strftime specifiers, never by positional
//! locale guessing. Downstream consumers get the canonical `YYYY-MM-DD-HH:MM`.

use chrono::NaiveDateTime;
use chrono::format::{self, ParseResult, Parsed, StrftimeItems};

/// Layout of timestamps in the bid and rate feeds.
pub const INPUT_FORMAT: &str = "%H-%d-%m-%Y";

/// Layout of timestamps in the normalized output.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d-%H:%M";

/// Day bucket used to key the error report.
pub const REPORT_DAY_FORMAT: &str = "%d-%m-%Y";

/// Parses a feed timestamp such as `08-15-01-2024` (08:00 on 15 January 2024).
///
/// The input carries no minute field, so minutes are fixed at zero.
pub fn parse_input(value: &str) -> ParseResult<NaiveDateTime> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, value.trim(), StrftimeItems::new(INPUT_FORMAT))?;
    parsed.set_minute(0)?;
    parsed.to_naive_datetime_with_offset(0)
}

/// Renders a timestamp back into the feed layout.
pub fn render_input(value: &NaiveDateTime) -> String {
    value.format(INPUT_FORMAT).to_string()
}

/// Renders a timestamp in the canonical output layout.
pub fn render_canonical(value: &NaiveDateTime) -> String {
    value.format(CANONICAL_FORMAT).to_string()
}

/// Renders the error report day bucket of a timestamp.
pub fn render_report_day(value: &NaiveDateTime) -> String {
    value.format(REPORT_DAY_FORMAT).to_string()
}

/// Error report day bucket of a raw feed timestamp.
///
/// Text that does not parse is kept as is, so a corrupted row still shows up
/// under the date it was submitted with.
pub fn report_day(raw: &str) -> String {
    match parse_input(raw) {
        Ok(value) => render_report_day(&value),
        Err(_) => raw.to_string(),
    }
}
