//! Video duration parsing and display formatting.
//!
//! Providers report durations as compact ISO-8601 tokens (`PT1H2M3S`). The
//! catalog stores a display string instead: `H:MM:SS`, or `M:SS` when the hour
//! component is zero.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Display value used when a duration is missing or unparseable.
pub const UNKNOWN_DURATION: &str = "N/A";

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?T?(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("valid duration regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration is empty")]
    Empty,
    #[error("invalid duration token: {0}")]
    InvalidFormat(String),
}

/// Parse an ISO-8601 duration token into total seconds.
///
/// # Examples
/// ```
/// use isc_models::duration::parse_iso8601_duration;
/// assert_eq!(parse_iso8601_duration("PT1H30M45S").unwrap(), 5445);
/// assert_eq!(parse_iso8601_duration("PT10M").unwrap(), 600);
/// ```
pub fn parse_iso8601_duration(token: &str) -> Result<u64, DurationError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DurationError::Empty);
    }

    let caps = ISO_DURATION
        .captures(token)
        .ok_or_else(|| DurationError::InvalidFormat(token.to_string()))?;

    // "P" or "PT" alone carry no component at all
    if caps.iter().skip(1).all(|c| c.is_none()) {
        return Err(DurationError::InvalidFormat(token.to_string()));
    }

    let component = |idx: usize| -> Result<u64, DurationError> {
        caps.get(idx)
            .map(|m| {
                m.as_str()
                    .parse::<u64>()
                    .map_err(|_| DurationError::InvalidFormat(token.to_string()))
            })
            .unwrap_or(Ok(0))
    };

    let days = component(1)?;
    let hours = component(2)?;
    let minutes = component(3)?;
    let seconds = component(4)?;

    // Components come from provider input; overflow is a malformed token
    [(days, 86_400u64), (hours, 3600), (minutes, 60), (seconds, 1)]
        .into_iter()
        .try_fold(0u64, |total, (value, unit)| {
            value.checked_mul(unit).and_then(|secs| total.checked_add(secs))
        })
        .ok_or_else(|| DurationError::InvalidFormat(token.to_string()))
}

/// Format seconds as `H:MM:SS`, or `M:SS` below one hour.
pub fn format_display_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Convert an ISO-8601 token to its display form, [`UNKNOWN_DURATION`] on failure.
pub fn display_duration(token: Option<&str>) -> String {
    token
        .and_then(|t| parse_iso8601_duration(t).ok())
        .map(format_display_duration)
        .unwrap_or_else(|| UNKNOWN_DURATION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT1H30M45S").unwrap(), 5445);
        assert_eq!(parse_iso8601_duration("PT10M").unwrap(), 600);
        assert_eq!(parse_iso8601_duration("PT45S").unwrap(), 45);
        assert_eq!(parse_iso8601_duration("PT2H").unwrap(), 7200);
        assert_eq!(parse_iso8601_duration("P1DT1S").unwrap(), 86_401);
        assert_eq!(parse_iso8601_duration("PT0S").unwrap(), 0);
    }

    #[test]
    fn test_parse_iso8601_duration_errors() {
        assert_eq!(parse_iso8601_duration(""), Err(DurationError::Empty));
        assert!(matches!(
            parse_iso8601_duration("PT"),
            Err(DurationError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_iso8601_duration("1:30"),
            Err(DurationError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_iso8601_duration("PTXM"),
            Err(DurationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_oversized_components_are_invalid() {
        assert!(matches!(
            parse_iso8601_duration("PT18446744073709551615H"),
            Err(DurationError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_iso8601_duration("P213503982334601DT8H"),
            Err(DurationError::InvalidFormat(_))
        ));
        // Larger than u64 altogether
        assert!(matches!(
            parse_iso8601_duration("PT99999999999999999999S"),
            Err(DurationError::InvalidFormat(_))
        ));
        assert_eq!(display_duration(Some("PT18446744073709551615H")), UNKNOWN_DURATION);
    }

    #[test]
    fn test_format_display_duration() {
        assert_eq!(format_display_duration(5445), "1:30:45");
        assert_eq!(format_display_duration(600), "10:00");
        assert_eq!(format_display_duration(45), "0:45");
        assert_eq!(format_display_duration(3600), "1:00:00");
        assert_eq!(format_display_duration(3605), "1:00:05");
    }

    #[test]
    fn test_display_duration_falls_back() {
        assert_eq!(display_duration(Some("PT4M13S")), "4:13");
        assert_eq!(display_duration(Some("garbage")), UNKNOWN_DURATION);
        assert_eq!(display_duration(None), UNKNOWN_DURATION);
    }
}
