//! Human readable interval parsing
//!
//! Accepts an ordered sequence of `<integer><unit>` components, each optional,
//! with units in descending order of magnitude:
//!
//! - days: `d`, `D`, `day`, `days`
//! - hours: `h`, `H`, `hour`, `hours`
//! - minutes: `m`, `M`, `min`, `minute`, `minutes`
//! - seconds: `s`, `S`, `sec`, `second`, `seconds`
//!
//! Whitespace is allowed between and inside components, so `"1h 30m"`,
//! `"1h30m"` and `"90 minutes"` are all valid.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*",
        r"(?:(?P<days>[0-9]+)\s*(?:days|day|D|d)\s*)?",
        r"(?:(?P<hours>[0-9]+)\s*(?:hours|hour|H|h)\s*)?",
        r"(?:(?P<minutes>[0-9]+)\s*(?:minutes|minute|min|M|m)\s*)?",
        r"(?:(?P<seconds>[0-9]+)\s*(?:seconds|second|sec|S|s)\s*)?",
        r"$",
    ))
    .expect("duration pattern is valid")
});

const UNITS: [(&str, u64); 4] = [
    ("days", SECONDS_PER_DAY),
    ("hours", SECONDS_PER_HOUR),
    ("minutes", SECONDS_PER_MINUTE),
    ("seconds", 1),
];

/// Parse a duration string into a number of seconds
///
/// An input without any component (including the empty string) is rejected
/// even though it matches the grammar vacuously.
pub fn parse_duration(text: &str) -> Result<u64> {
    let invalid = || Error::InvalidDuration(text.to_string());

    let captures = DURATION_PATTERN.captures(text).ok_or_else(invalid)?;

    let mut total: u64 = 0;
    let mut components = 0;

    for (unit, unit_seconds) in UNITS {
        let Some(value) = captures.name(unit) else {
            continue;
        };

        components += 1;
        let value: u64 = value.as_str().parse().map_err(|_| invalid())?;
        total = value
            .checked_mul(unit_seconds)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(invalid)?;
    }

    if components == 0 {
        return Err(invalid());
    }

    Ok(total)
}

/// Render seconds in canonical `Xd Yh Zm Ws` form, omitting zero components
pub fn format_duration(seconds: u64) -> String {
    let mut parts = Vec::new();
    let mut remaining = seconds;

    for (suffix, unit_seconds) in [
        ("d", SECONDS_PER_DAY),
        ("h", SECONDS_PER_HOUR),
        ("m", SECONDS_PER_MINUTE),
    ] {
        let value = remaining / unit_seconds;
        if value > 0 {
            parts.push(format!("{value}{suffix}"));
        }
        remaining %= unit_seconds;
    }

    if remaining > 0 || parts.is_empty() {
        parts.push(format!("{remaining}s"));
    }

    parts.join(" ")
}
