//! Prompt construction for timecode extraction.

use std::path::Path;

use vshorts_models::{PopularitySegment, TranscriptChunk};

use crate::error::InferenceResult;

/// Placeholder replaced with the serialized popularity hints.
pub const HINTS_PLACEHOLDER: &str = "{hints}";
/// Placeholder replaced with the chunk text.
pub const TRANSCRIPT_PLACEHOLDER: &str = "{transcript}";

const DEFAULT_TEMPLATE: &str = "\
You are an expert in making viral short videos. You are given the transcript of a long video and some audio hints. \
Your task is to find 2-3 fragments that can be cut into short videos (15-30 seconds) that viewers will love and share.
Viral fragments are moments that trigger a strong reaction. Pay attention to:
- Emotion: laughter, surprise, delight, shock or anger in speech. Words like \"incredible\" or \"I'm shocked\", and markers such as [LAUGHTER] or [APPLAUSE], are clear signals.
- An unexpected turn or insight: something happens suddenly, a mystery is revealed, a very important idea is voiced.
- Reaction and energy: the speaker raises their voice or changes intonation, the audience gasps or laughs, dramatic music starts.
Audio popularity hints (JSON, seconds): {hints}
Output format, one fragment per line:
<mm:ss> - <mm:ss> Description of the moment

Analyze the transcript and the audio hints and pick the best moments with their start and end timecodes. \
Justify each choice briefly on the same line.

{transcript}";

/// Builds model prompts from a fixed instruction template.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptBuilder {
    /// Use a custom template. A template without `{transcript}` gets the
    /// chunk text appended after a blank line.
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Load a template from a file.
    pub async fn from_file(path: impl AsRef<Path>) -> InferenceResult<Self> {
        let template = tokio::fs::read_to_string(path).await?;
        Ok(Self::with_template(template))
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn build(&self, chunk: &TranscriptChunk, hints: &[PopularitySegment]) -> String {
        // Serializing plain f64 fields cannot fail; non-finite values become null.
        let hints_json = serde_json::to_string(hints).unwrap_or_else(|_| "[]".to_string());

        let prompt = self.template.replace(HINTS_PLACEHOLDER, &hints_json);
        if prompt.contains(TRANSCRIPT_PLACEHOLDER) {
            prompt.replace(TRANSCRIPT_PLACEHOLDER, &chunk.text)
        } else {
            format!("{}\n\n{}", prompt.trim_end(), chunk.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> TranscriptChunk {
        TranscriptChunk::new(0, text)
    }

    #[test]
    fn test_default_prompt_embeds_chunk_and_empty_hints() {
        let prompt = PromptBuilder::default().build(&chunk("[00:00:05] hello there"), &[]);

        assert!(prompt.contains("Audio popularity hints (JSON, seconds): []"));
        assert!(prompt.ends_with("[00:00:05] hello there"));
        assert!(prompt.contains("<mm:ss> - <mm:ss> Description of the moment"));
        assert!(!prompt.contains(TRANSCRIPT_PLACEHOLDER));
    }

    #[test]
    fn test_prompt_serializes_hints() {
        let hints = vec![PopularitySegment {
            start: 12.5,
            end: 20.0,
            score: 0.9,
        }];
        let prompt = PromptBuilder::default().build(&chunk("text"), &hints);
        assert!(prompt.contains(r#"[{"start":12.5,"end":20.0,"score":0.9}]"#));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PromptBuilder::default();
        assert_eq!(
            builder.build(&chunk("same"), &[]),
            builder.build(&chunk("same"), &[])
        );
    }

    #[test]
    fn test_template_without_transcript_placeholder() {
        let builder = PromptBuilder::with_template("Find moments. Hints: {hints}\n");
        assert_eq!(
            builder.build(&chunk("body"), &[]),
            "Find moments. Hints: []\n\nbody"
        );
    }

    #[tokio::test]
    async fn test_template_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        tokio::fs::write(&path, "T: {transcript}").await.unwrap();

        let builder = PromptBuilder::from_file(&path).await.unwrap();
        assert_eq!(builder.build(&chunk("x"), &[]), "T: x");
    }
}
