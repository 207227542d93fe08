//! `M:SS` clock notation used by scene markers.
//!
//! Scripts may annotate a scene marker with a literal time range such as
//! `Scene 1 (0:00-0:15)`. Each side of the range is minutes and seconds.

use thiserror::Error;

/// Errors produced while parsing a clock value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Timestamp is empty")]
    Empty,

    #[error("Invalid timestamp format: {0}")]
    InvalidFormat(String),

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
}

/// Parse an `M:SS` clock value to total seconds.
///
/// Both components must be unsigned integers. The minutes component may
/// have any number of digits (`12:05` is 725 seconds).
///
/// # Examples
/// ```
/// use reel_models::timestamp::parse_clock;
/// assert_eq!(parse_clock("0:15").unwrap(), 15.0);
/// assert_eq!(parse_clock("2:05").unwrap(), 125.0);
/// assert!(parse_clock("1:02:03").is_err());
/// ```
pub fn parse_clock(value: &str) -> Result<f64, TimestampError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TimestampError::Empty);
    }

    let (minutes, seconds) = value
        .split_once(':')
        .ok_or_else(|| TimestampError::InvalidFormat(value.to_string()))?;

    if seconds.contains(':') {
        return Err(TimestampError::InvalidFormat(value.to_string()));
    }

    let minutes: u32 = parse_component("minutes", minutes)?;
    let seconds: u32 = parse_component("seconds", seconds)?;

    Ok(f64::from(minutes) * 60.0 + f64::from(seconds))
}

fn parse_component(name: &'static str, raw: &str) -> Result<u32, TimestampError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::InvalidValue(name, raw.to_string()));
    }
    raw.parse()
        .map_err(|_| TimestampError::InvalidValue(name, raw.to_string()))
}

/// Format seconds as `M:SS`, rounding to the nearest whole second.
pub fn format_clock(total_secs: f64) -> String {
    let total = total_secs.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("0:00").unwrap(), 0.0);
        assert_eq!(parse_clock("0:15").unwrap(), 15.0);
        assert_eq!(parse_clock("1:30").unwrap(), 90.0);
        assert_eq!(parse_clock(" 10:00 ").unwrap(), 600.0);
    }

    #[test]
    fn test_parse_clock_rejects_malformed() {
        assert_eq!(parse_clock(""), Err(TimestampError::Empty));
        assert!(parse_clock("15").is_err());
        assert!(parse_clock("1:02:03").is_err());
        assert!(parse_clock("a:10").is_err());
        assert!(parse_clock("1:").is_err());
        assert!(parse_clock("-1:10").is_err());
        assert!(parse_clock("1:1.5").is_err());
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(15.0), "0:15");
        assert_eq!(format_clock(125.4), "2:05");
        assert_eq!(format_clock(-3.0), "0:00");
    }

    #[test]
    fn test_clock_round_trip() {
        for secs in [0.0, 9.0, 59.0, 60.0, 61.0, 754.0] {
            assert_eq!(parse_clock(&format_clock(secs)).unwrap(), secs);
        }
    }
}
