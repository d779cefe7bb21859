// src/utils/date.rs

//! Best-effort timestamp parsing for loosely formatted upstream dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%B %d, %Y"];

/// Parse a timestamp string in any of the common feed/API formats.
///
/// Naive values are taken as UTC. Returns `None` when nothing matches.
pub fn parse_loose(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let text = strip_zone_label(text).unwrap_or_else(|| text.to_string());

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Remove a trailing " UTC", " GMT", "Z" or "(UTC)" label.
fn strip_zone_label(text: &str) -> Option<String> {
    let pattern = Regex::new(r"\s*(?:\(?(?:UTC|GMT)\)?|Z)$").ok()?;
    pattern
        .is_match(text)
        .then(|| pattern.replace(text, "").trim().to_string())
}
