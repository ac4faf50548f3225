//! Text rendering helpers for chat replies

use chrono::{DateTime, FixedOffset, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Human relative time between `at` and `now`
///
/// Past instants read `5 minutes ago`, future ones `in 5 minutes`. An
/// absent timestamp renders as an empty string.
pub fn relative_time(at: Option<DateTime<FixedOffset>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return String::new();
    };
    let delta = now.signed_duration_since(at).num_seconds();
    if delta.abs() < 10 {
        return "just now".to_string();
    }
    let span = span(delta.abs());
    if delta > 0 {
        format!("{} ago", span)
    } else {
        format!("in {}", span)
    }
}

fn span(secs: i64) -> String {
    match secs {
        s if s < MINUTE => format!("{} seconds", s),
        s if s < 2 * MINUTE => "a minute".to_string(),
        s if s < HOUR => format!("{} minutes", s / MINUTE),
        s if s < 2 * HOUR => "an hour".to_string(),
        s if s < DAY => format!("{} hours", s / HOUR),
        s if s < 2 * DAY => "a day".to_string(),
        s if s < MONTH => format!("{} days", s / DAY),
        s if s < 2 * MONTH => "a month".to_string(),
        s if s < YEAR => format!("{} months", s / MONTH),
        s if s < 2 * YEAR => "a year".to_string(),
        s => format!("{} years", s / YEAR),
    }
}

/// Decimal byte size, e.g. `12.34 GB`
pub fn human_size(bytes: Option<u64>) -> String {
    const UNITS: [(&str, f64); 4] = [("TB", 1e12), ("GB", 1e9), ("MB", 1e6), ("kB", 1e3)];
    let Some(bytes) = bytes else {
        return String::new();
    };
    let value = bytes as f64;
    UNITS
        .iter()
        .find(|(_, scale)| value >= *scale)
        .map(|(unit, scale)| format!("{:.2} {}", value / scale, unit))
        .unwrap_or_else(|| format!("{} B", bytes))
}
