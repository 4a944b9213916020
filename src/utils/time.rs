//! Date and duration formatting.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

/// ISO 8601 duration as reported by the engine, e.g. `PT0.035S`.
static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"P(?:([\d.]+)D)?T(?:([\d.]+)H)?(?:([\d.]+)M)?(?:([\d.]+)S)?")
        .unwrap_or_else(|_| unreachable!())
});

/// Weekday, month name, day and year: `Monday, January 1, 2024`.
pub const PRETTY_DATE: &str = "%A, %B %-d, %Y";

/// Weekday, month name and day: `Monday, January 1`.
pub const PRETTY_DATE_SHORT: &str = "%A, %B %-d";

/// Default date pattern: `2024-01-01 13:45:00`.
pub const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Duration split into display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationParts {
    /// Whole days.
    pub days: u64,
    /// Hours, 0-23.
    pub hours: u64,
    /// Minutes, 0-59.
    pub minutes: u64,
    /// Seconds, 0-59.
    pub seconds: u64,
    /// Milliseconds, 0-999.
    pub millis: u64,
}

fn parse_component(value: Option<regex::Match<'_>>, input: &str) -> Result<f64> {
    value.map_or(Ok(0.0), |m| {
        m.as_str()
            .parse::<f64>()
            .map_err(|_| Error::InvalidInput(format!("invalid duration: {input}")))
    })
}

/// Parses an ISO 8601 duration of the form `P[nD]T[nH][nM][nS]`.
///
/// Fractional components carry over into smaller units.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the string does not match.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_iso_duration(input: &str) -> Result<DurationParts> {
    let captures = ISO_DURATION
        .captures(input)
        .ok_or_else(|| Error::InvalidInput(format!("invalid duration: {input}")))?;

    let days = parse_component(captures.get(1), input)?;
    let hours = parse_component(captures.get(2), input)?;
    let minutes = parse_component(captures.get(3), input)?;
    let seconds = parse_component(captures.get(4), input)?;

    let total_seconds = days.mul_add(86_400.0, hours.mul_add(3_600.0, minutes.mul_add(60.0, seconds)));
    // The epsilon absorbs binary representation error, e.g. 1.001 * 1000.
    let total_millis = total_seconds.mul_add(1000.0, 1e-6).floor() as u64;
    let total_secs = total_millis / 1000;
    let total_minutes = total_secs / 60;

    Ok(DurationParts {
        days: days.floor() as u64,
        hours: (total_minutes / 60) % 24,
        minutes: total_minutes % 60,
        seconds: total_secs % 60,
        millis: total_millis % 1000,
    })
}

/// Renders an ISO 8601 duration for humans.
///
/// Once a larger unit is shown, every smaller unit down to minutes is shown
/// too. Milliseconds are shown for sub-10-second remainders only.
///
/// ```
/// use searchdeck::utils::format_duration;
///
/// assert_eq!(format_duration("PT0.012S").unwrap(), "0.012s");
/// assert_eq!(format_duration("P1DT2H0M3S").unwrap(), "1d 2h 0m 3s");
/// assert_eq!(format_duration("PT1H").unwrap(), "1h 0m");
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the string does not match.
pub fn format_duration(input: &str) -> Result<String> {
    let DurationParts {
        days,
        hours,
        minutes,
        seconds,
        millis,
    } = parse_iso_duration(input)?;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 || !parts.is_empty() {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 || !parts.is_empty() {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || millis > 0 {
        if millis > 0 && seconds < 10 {
            parts.push(format!("{seconds}.{millis:03}s"));
        } else {
            parts.push(format!("{seconds}s"));
        }
    }

    if parts.is_empty() {
        return Ok("0s".to_string());
    }
    Ok(parts.join(" "))
}

/// Options for [`format_date`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormatOptions {
    /// `strftime` pattern.
    pub pattern: String,
    /// Offset the date is shown in.
    pub offset: FixedOffset,
    /// Appends ` (UTC+hh:mm)`.
    pub display_time_zone: bool,
}

impl Default for DateFormatOptions {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DATE_PATTERN.to_string(),
            offset: FixedOffset::east_opt(0).unwrap_or_else(|| unreachable!()),
            display_time_zone: false,
        }
    }
}

impl DateFormatOptions {
    /// Sets the pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Sets the display offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Enables the time zone suffix.
    #[must_use]
    pub const fn with_time_zone(mut self, display: bool) -> Self {
        self.display_time_zone = display;
        self
    }
}

/// Parses an RFC 3339 timestamp.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the string is not RFC 3339.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("invalid date `{value}`: {e}")))
}

/// Parses an offset such as `+02:00`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the offset is malformed.
pub fn parse_offset(value: &str) -> Result<FixedOffset> {
    value
        .parse::<FixedOffset>()
        .map_err(|e| Error::InvalidInput(format!("invalid UTC offset `{value}`: {e}")))
}

/// Formats `date` in the configured offset. `None` stays `None`.
///
/// An unusable pattern falls back to RFC 3339.
#[must_use]
pub fn format_date(date: Option<DateTime<Utc>>, options: &DateFormatOptions) -> Option<String> {
    let local = date?.with_timezone(&options.offset);

    let mut output = String::new();
    if write!(output, "{}", local.format(&options.pattern)).is_err() {
        output = local.to_rfc3339();
    }
    if options.display_time_zone {
        let _ = write!(output, " (UTC{})", options.offset);
    }
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("PT0.012345S", "0.012s" ; "sub second")]
    #[test_case("PT1.5S", "1.500s" ; "padded millis")]
    #[test_case("PT12.5S", "12s" ; "millis hidden past ten seconds")]
    #[test_case("PT3M", "3m" ; "minutes only")]
    #[test_case("PT1H", "1h 0m" ; "hours force minutes")]
    #[test_case("PT1H0M5S", "1h 0m 5s" ; "hours and seconds")]
    #[test_case("P1DT2H3M4S", "1d 2h 3m 4s" ; "all units")]
    #[test_case("P1.5DT", "1d 12h 0m" ; "fractional day")]
    #[test_case("PT90S", "1m 30s" ; "seconds carry")]
    #[test_case("PT0S", "0s" ; "zero")]
    #[test_case("PT1.001S", "1.001s" ; "float error absorbed")]
    fn test_format_duration(input: &str, expected: &str) {
        assert_eq!(format_duration(input).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("P1D" ; "missing time designator")]
    #[test_case("5 seconds" ; "prose")]
    #[test_case("PT1.2.3S" ; "bad number")]
    fn test_format_duration_rejects(input: &str) {
        assert!(matches!(format_duration(input), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_format_date_in_offset() {
        let date = parse_date("2024-03-01T22:30:00Z").unwrap();
        let options = DateFormatOptions::default()
            .with_offset(parse_offset("+02:00").unwrap())
            .with_time_zone(true);

        assert_eq!(
            format_date(Some(date), &options).unwrap(),
            "2024-03-02 00:30:00 (UTC+02:00)"
        );
    }

    #[test]
    fn test_format_date_presets() {
        let date = parse_date("2024-01-01T08:00:00Z").unwrap();

        let pretty = DateFormatOptions::default().with_pattern(PRETTY_DATE);
        let short = DateFormatOptions::default().with_pattern(PRETTY_DATE_SHORT);

        assert_eq!(format_date(Some(date), &pretty).unwrap(), "Monday, January 1, 2024");
        assert_eq!(format_date(Some(date), &short).unwrap(), "Monday, January 1");
    }

    #[test]
    fn test_format_date_none() {
        assert!(format_date(None, &DateFormatOptions::default()).is_none());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("yesterday").is_err());
        assert!(parse_offset("+25:99").is_err());
    }
}
