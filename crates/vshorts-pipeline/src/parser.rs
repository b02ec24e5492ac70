//! Timecode parsing from free-text model responses.

use std::sync::OnceLock;

use regex::Regex;
use vshorts_models::Timecode;

/// `<time> - <time> <description>`, where `<time>` is `M:SS`, `MM:SS` or `H:MM:SS`.
const TIMECODE_LINE: &str = r"^(\d{1,2}:\d{2}(?::\d{2})?)\s*-\s*(\d{1,2}:\d{2}(?::\d{2})?)\s+(.+)$";

fn timecode_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TIMECODE_LINE).expect("timecode pattern is valid"))
}

/// Result of parsing one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    /// Timecodes in line order
    pub timecodes: Vec<Timecode>,
    /// Non-blank lines that did not yield a timecode
    pub ignored_lines: usize,
}

impl ParseReport {
    pub fn is_empty(&self) -> bool {
        self.timecodes.is_empty()
    }
}

/// Parse a model response line by line.
///
/// Blank lines are skipped silently. Lines that do not match the grammar, or
/// match but end at or before their start, are counted in `ignored_lines`.
pub fn parse(response: &str) -> ParseReport {
    let mut report = ParseReport::default();

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Some(timecode) => report.timecodes.push(timecode),
            None => report.ignored_lines += 1,
        }
    }

    report
}

fn parse_line(line: &str) -> Option<Timecode> {
    let caps = timecode_line().captures(line)?;
    let timecode = Timecode::new(caps[1].trim(), caps[2].trim(), caps[3].trim());
    timecode.is_well_formed().then_some(timecode)
}
