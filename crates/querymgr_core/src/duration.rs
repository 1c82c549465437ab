//! Human readable durations, e.g. `30s`, `1.5h`, `100d`.
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static DURATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*([a-zA-Z]+)\s*$").unwrap());

/// Units from smallest to largest along with their length in nanoseconds.
const UNITS: [(&str, f64); 7] = [
    ("ns", 1.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60.0 * 1_000_000_000.0),
    ("h", 60.0 * 60.0 * 1_000_000_000.0),
    ("d", 24.0 * 60.0 * 60.0 * 1_000_000_000.0),
];

/// Parse a `<number><unit>` duration string.
///
/// Returns `None` if the string isn't a valid duration.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let captures = DURATION_PATTERN.captures(s)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let unit = captures.get(2)?.as_str();

    let (_, nanos_per_unit) = UNITS.iter().find(|(name, _)| *name == unit)?;
    let nanos = value * nanos_per_unit;
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return None;
    }

    Some(Duration::from_nanos(nanos.round() as u64))
}

/// Format a duration using the largest unit that keeps the value at or above
/// one.
pub fn format_duration(dur: Duration) -> String {
    let nanos = dur.as_nanos() as f64;
    let (unit, nanos_per_unit) = UNITS
        .iter()
        .rev()
        .find(|(_, nanos_per_unit)| nanos / nanos_per_unit >= 0.9999)
        .copied()
        .unwrap_or(UNITS[0]);

    format!("{:.2}{unit}", nanos / nanos_per_unit)
}

/// Serde helpers for representing durations as strings.
pub mod serde_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dur: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_duration(*dur))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: '{s}'")))
    }
}
