//! Banned-phrase content filter.

use vshorts_models::Timecode;

/// Removes timecodes whose text contains a banned phrase.
///
/// Matching is a case-insensitive substring test. Blank phrases are ignored.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    phrases: Vec<String>,
}

impl ContentFilter {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn is_banned(&self, timecode: &Timecode) -> bool {
        if self.phrases.is_empty() {
            return false;
        }
        let text = timecode.text.to_lowercase();
        self.phrases.iter().any(|p| text.contains(p.as_str()))
    }

    /// Keep the allowed timecodes, preserving order.
    pub fn filter(&self, timecodes: Vec<Timecode>) -> Vec<Timecode> {
        timecodes.into_iter().filter(|t| !self.is_banned(t)).collect()
    }
}

/// Filter `timecodes` against `banned_phrases` in one call.
pub fn filter(timecodes: Vec<Timecode>, banned_phrases: &[String]) -> Vec<Timecode> {
    ContentFilter::new(banned_phrases).filter(timecodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(text: &str) -> Timecode {
        Timecode::new("00:00", "00:10", text)
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let filter = ContentFilter::new(["Promo Code"]);
        let kept = filter.filter(vec![
            tc("Use PROMO code SAVE10"),
            tc("A genuine insight"),
            tc("promo codes everywhere"),
        ]);
        assert_eq!(kept, vec![tc("A genuine insight")]);
    }

    #[test]
    fn test_filter_preserves_order() {
        let filter = ContentFilter::new(["sponsor"]);
        let kept = filter.filter(vec![tc("first"), tc("sponsored segment"), tc("second"), tc("third")]);
        let texts: Vec<_> = kept.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let phrases = vec!["реклама".to_string(), "subscribe".to_string()];
        let input = vec![tc("РЕКЛАМА магазина"), tc("Смешной момент"), tc("Please SUBSCRIBE"), tc("Shock")];

        let once = filter(input, &phrases);
        let twice = filter(once.clone(), &phrases);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_blank_phrases_never_match() {
        let filter = ContentFilter::new(["", "   "]);
        assert!(!filter.is_banned(&tc("anything")));
        assert_eq!(filter.filter(vec![tc("a"), tc("b")]).len(), 2);
    }
}
