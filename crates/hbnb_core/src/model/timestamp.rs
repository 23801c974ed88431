//! Record timestamp clock and textual format.
//!
//! # Invariants
//! - Timestamps carry whole microseconds only, so the textual form
//!   `YYYY-MM-DDTHH:MM:SS.ffffff` round-trips without loss.
//! - Parsing accepts that exact pattern and nothing else.

use chrono::{Local, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

/// chrono format string for the persisted timestamp text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{6}$").expect("valid timestamp regex")
});

/// Returns the current local wall-clock time truncated to microseconds.
pub fn now() -> NaiveDateTime {
    truncate_to_micros(Local::now().naive_local())
}

/// Formats `value` as `YYYY-MM-DDTHH:MM:SS.ffffff`.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses the exact persisted timestamp text.
///
/// Returns `None` when the text does not match the pattern or names an
/// impossible calendar date/time.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if !TIMESTAMP_RE.is_match(text) {
        return None;
    }
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

fn truncate_to_micros(value: NaiveDateTime) -> NaiveDateTime {
    let micros_as_nanos = value.nanosecond() / 1_000 * 1_000;
    value.with_nanosecond(micros_as_nanos).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, now, parse_timestamp};
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn parse_accepts_exact_pattern() {
        let parsed = parse_timestamp("2017-09-28T21:03:54.052298").expect("valid timestamp");
        let expected = NaiveDate::from_ymd_opt(2017, 9, 28)
            .and_then(|date| date.and_hms_micro_opt(21, 3, 54, 52_298))
            .expect("valid date");
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parse_rejects_malformed_text() {
        for text in [
            "2024-13-40",
            "2017-09-28T21:03:54",
            "2017-09-28T21:03:54.052",
            "2017-09-28T21:03:54.0522981",
            "2017-09-28 21:03:54.052298",
            "2017-02-30T10:00:00.000000",
            "2017-09-28T21:03:54.052298Z",
            "",
        ] {
            assert!(parse_timestamp(text).is_none(), "`{text}` should be rejected");
        }
    }

    #[test]
    fn format_always_emits_six_fraction_digits() {
        let value = NaiveDate::from_ymd_opt(2020, 1, 2)
            .and_then(|date| date.and_hms_micro_opt(3, 4, 5, 0))
            .expect("valid date");
        assert_eq!(format_timestamp(&value), "2020-01-02T03:04:05.000000");
    }

    #[test]
    fn now_has_microsecond_precision_and_round_trips() {
        let value = now();
        assert_eq!(value.nanosecond() % 1_000, 0);
        assert_eq!(parse_timestamp(&format_timestamp(&value)), Some(value));
    }
}
