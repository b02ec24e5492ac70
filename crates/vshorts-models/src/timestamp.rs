//! Timestamp normalization.
//!
//! Model output and transcripts carry clock tokens such as `1:05`, `01:05`
//! or `1:02:03`. Components are read right-to-left as seconds, minutes and
//! hours.

use thiserror::Error;

/// Units for the clock components, right-to-left.
const UNIT_SECONDS: [f64; 3] = [1.0, 60.0, 3600.0];

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp has too many components: {0}")]
    TooManyComponents(String),

    #[error("Invalid timestamp component '{0}'")]
    InvalidComponent(String),
}

/// Parse a clock token to total seconds.
///
/// # Examples
/// ```
/// use vshorts_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("1:02:03").unwrap(), 3723.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > UNIT_SECONDS.len() {
        return Err(TimestampError::TooManyComponents(ts.to_string()));
    }

    parts
        .iter()
        .rev()
        .zip(UNIT_SECONDS)
        .try_fold(0.0, |total, (part, unit)| {
            let value = parse_component(part)?;
            Ok(total + value * unit)
        })
}

fn parse_component(part: &str) -> Result<f64, TimestampError> {
    let part = part.trim();
    // f64::from_str accepts signs, "inf" and "NaN"; clock components are digits only.
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(TimestampError::InvalidComponent(part.to_string()));
    }
    part.parse::<f64>()
        .map_err(|_| TimestampError::InvalidComponent(part.to_string()))
}

/// Format seconds as `HH:MM:SS`, keeping milliseconds when present.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u64;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u64;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u64)
    }
}
