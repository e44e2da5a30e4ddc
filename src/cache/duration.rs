//! Duration Module
//!
//! Turns caller-supplied durations ("5 minutes", "2 hours", raw milliseconds)
//! into milliseconds.

use std::time::Duration;

use serde::Deserialize;

// == Units ==
const MS: i64 = 1;
const SECOND: i64 = 1_000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;

// == Duration Spec ==
/// A duration as given by a caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    /// Milliseconds, used unchanged
    Millis(i64),
    /// Human readable, e.g. `"5 minutes"`
    Text(String),
}

impl DurationSpec {
    // == Resolve ==
    /// Resolves to milliseconds, falling back to `default_ms` for text that
    /// is not of the form `<amount> <unit>`.
    pub fn to_millis(&self, default_ms: i64) -> i64 {
        match self {
            DurationSpec::Millis(ms) => *ms,
            DurationSpec::Text(text) => parse_duration(text).unwrap_or(default_ms),
        }
    }
}

impl From<i64> for DurationSpec {
    fn from(ms: i64) -> Self {
        DurationSpec::Millis(ms)
    }
}

impl From<i32> for DurationSpec {
    fn from(ms: i32) -> Self {
        DurationSpec::Millis(i64::from(ms))
    }
}

impl From<Duration> for DurationSpec {
    fn from(duration: Duration) -> Self {
        DurationSpec::Millis(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
    }
}

impl From<&str> for DurationSpec {
    fn from(text: &str) -> Self {
        DurationSpec::Text(text.to_string())
    }
}

impl From<String> for DurationSpec {
    fn from(text: String) -> Self {
        DurationSpec::Text(text)
    }
}

// == Parse ==
/// Parses `<amount> <unit>` into milliseconds.
///
/// Returns `None` when the text does not have that shape: digits, dots and
/// commas, exactly one whitespace character, then an ASCII word. Unit
/// matching is case-insensitive with one trailing `s` stripped, `m` means
/// milliseconds, and an unknown unit yields 0. Commas are ignored and only
/// the leading number is read (`"1.2.3"` is 1.2). A zero or unreadable
/// amount counts as 1.
pub fn parse_duration(text: &str) -> Option<i64> {
    let (amount, unit) = text.split_once(char::is_whitespace)?;

    let amount_ok = !amount.is_empty()
        && amount
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',');
    let unit_ok = !unit.is_empty()
        && unit
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !amount_ok || !unit_ok {
        return None;
    }

    let amount = leading_number(&amount.replace(',', ""))
        .filter(|n| *n != 0.0)
        .unwrap_or(1.0);

    Some((amount * unit_millis(unit) as f64) as i64)
}

/// Reads digits with at most one decimal point, ignoring the rest.
fn leading_number(digits: &str) -> Option<f64> {
    let end = digits
        .match_indices('.')
        .nth(1)
        .map_or(digits.len(), |(at, _)| at);
    digits[..end].parse().ok()
}

fn unit_millis(unit: &str) -> i64 {
    let unit = unit.to_lowercase();
    let unit = unit.strip_suffix('s').unwrap_or(&unit);

    match unit {
        "m" | "ms" => MS,
        "second" => SECOND,
        "minute" => MINUTE,
        "hour" => HOUR,
        "day" => DAY,
        "week" => WEEK,
        "month" => MONTH,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: i64 = 3_600_000;

    #[test]
    fn test_minutes() {
        assert_eq!(DurationSpec::from("2 minutes").to_millis(DEFAULT), 120_000);
    }

    #[test]
    fn test_milliseconds() {
        assert_eq!(DurationSpec::from("500 ms").to_millis(DEFAULT), 500);
        assert_eq!(DurationSpec::from("500 m").to_millis(DEFAULT), 500);
    }

    #[test]
    fn test_case_insensitive_units() {
        assert_eq!(parse_duration("1 HOUR"), Some(HOUR));
        assert_eq!(parse_duration("3 Days"), Some(3 * DAY));
        assert_eq!(parse_duration("1 week"), Some(WEEK));
        assert_eq!(parse_duration("1 month"), Some(MONTH));
        assert_eq!(parse_duration("10 seconds"), Some(10 * SECOND));
    }

    #[test]
    fn test_fractional_amount() {
        assert_eq!(parse_duration("1.5 seconds"), Some(1_500));
    }

    #[test]
    fn test_only_leading_number_is_read() {
        assert_eq!(parse_duration("1.2.3 seconds"), Some(1_200));
        assert_eq!(parse_duration(".5 seconds"), Some(500));
        assert_eq!(parse_duration(". seconds"), Some(SECOND));
    }

    #[test]
    fn test_surrounding_whitespace_is_not_trimmed() {
        assert_eq!(parse_duration(" 2 minutes"), None);
        assert_eq!(parse_duration("2 minutes "), None);
        assert_eq!(parse_duration("2  minutes"), None);
        assert_eq!(DurationSpec::from(" 2 minutes").to_millis(DEFAULT), DEFAULT);
    }

    #[test]
    fn test_non_ascii_unit_is_rejected() {
        assert_eq!(parse_duration("2 minutés"), None);
    }

    #[test]
    fn test_zero_amount_counts_as_one() {
        assert_eq!(parse_duration("0 minutes"), Some(MINUTE));
    }

    #[test]
    fn test_unknown_unit_is_zero() {
        assert_eq!(parse_duration("5 fortnights"), Some(0));
    }

    #[test]
    fn test_unparseable_uses_default() {
        assert_eq!(DurationSpec::from("soon").to_millis(DEFAULT), DEFAULT);
        assert_eq!(DurationSpec::from("").to_millis(DEFAULT), DEFAULT);
        assert_eq!(DurationSpec::from("five minutes").to_millis(DEFAULT), DEFAULT);
    }

    #[test]
    fn test_numeric_passes_through() {
        assert_eq!(DurationSpec::from(1234).to_millis(DEFAULT), 1234);
        assert_eq!(DurationSpec::from(-5).to_millis(DEFAULT), -5);
        assert_eq!(
            DurationSpec::from(Duration::from_secs(2)).to_millis(DEFAULT),
            2_000
        );
    }

    #[test]
    fn test_deserialize_untagged() {
        let spec: DurationSpec = serde_json::from_str("250").unwrap();
        assert_eq!(spec, DurationSpec::Millis(250));

        let spec: DurationSpec = serde_json::from_str(r#""5 minutes""#).unwrap();
        assert_eq!(spec, DurationSpec::Text("5 minutes".to_string()));
    }
}
