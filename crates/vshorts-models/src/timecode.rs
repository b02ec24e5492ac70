//! Timecode, interval and popularity-hint models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::{parse_timestamp, TimestampError};

/// A structured `(start, end, text)` interval extracted from model output.
///
/// `start` and `end` keep the token exactly as the model wrote it
/// (`01:23`, `1:02:03`, or plain seconds such as `90`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Timecode {
    pub start: String,
    pub end: String,
    pub text: String,
}

impl Timecode {
    pub fn new(start: impl Into<String>, end: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            text: text.into(),
        }
    }

    /// Start time in seconds.
    pub fn start_secs(&self) -> Result<f64, TimestampError> {
        parse_timestamp(&self.start)
    }

    /// End time in seconds.
    pub fn end_secs(&self) -> Result<f64, TimestampError> {
        parse_timestamp(&self.end)
    }

    /// Normalized interval; `None` when either bound cannot be parsed.
    pub fn interval(&self) -> Option<Interval> {
        Some(Interval::new(self.start_secs().ok()?, self.end_secs().ok()?))
    }

    /// Whether the timecode satisfies the extraction invariant:
    /// end strictly after start and non-blank text.
    pub fn is_well_formed(&self) -> bool {
        !self.text.trim().is_empty()
            && self
                .interval()
                .map(|interval| interval.end > interval.start)
                .unwrap_or(false)
    }
}

/// A time range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Clamp the end so the interval lasts at most `max_duration` seconds.
    pub fn capped(self, max_duration: f64) -> Self {
        Self {
            start: self.start,
            end: self.end.min(self.start + max_duration),
        }
    }
}

/// Audio-level interest hint produced by an external analyzer.
///
/// Passed through unmodified into prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PopularitySegment {
    pub start: f64,
    pub end: f64,
    #[serde(alias = "popularity_score")]
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timecode_interval() {
        let tc = Timecode::new("00:10", "00:30", "Main");
        let interval = tc.interval().unwrap();
        assert_eq!(interval.start, 10.0);
        assert_eq!(interval.end, 30.0);
        assert_eq!(interval.duration(), 20.0);
        assert!(tc.is_well_formed());
    }

    #[test]
    fn test_timecode_invariant() {
        assert!(!Timecode::new("00:30", "00:10", "backwards").is_well_formed());
        assert!(!Timecode::new("00:10", "00:10", "zero length").is_well_formed());
        assert!(!Timecode::new("00:10", "00:20", "   ").is_well_formed());
        assert!(!Timecode::new("xx", "00:20", "bad start").is_well_formed());
    }

    #[test]
    fn test_interval_capped() {
        let interval = Interval::new(5.0, 95.0).capped(60.0);
        assert_eq!(interval, Interval::new(5.0, 65.0));

        let short = Interval::new(5.0, 15.0).capped(60.0);
        assert_eq!(short, Interval::new(5.0, 15.0));
    }

    #[test]
    fn test_popularity_segment_accepts_score_alias() {
        let seg: PopularitySegment =
            serde_json::from_str(r#"{"start": 1.5, "end": 4.0, "popularity_score": 0.8}"#).unwrap();
        assert_eq!(seg.score, 0.8);

        let json = serde_json::to_string(&seg).unwrap();
        assert!(json.contains("\"score\":0.8"));
    }
}
