//! Transcript chunking.

use vshorts_models::TranscriptChunk;

use crate::error::{PipelineError, PipelineResult};

/// Split `text` into consecutive chunks of at most `max_length` characters.
///
/// Chunks never split a character, cover the text exactly once and are
/// returned in order. Empty text yields no chunks.
pub fn split(text: &str, max_length: usize) -> PipelineResult<Vec<TranscriptChunk>> {
    if max_length == 0 {
        return Err(PipelineError::invalid_input("max chunk length must be at least 1"));
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == max_length {
            chunks.push(TranscriptChunk::new(chunks.len(), &text[start..offset]));
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(TranscriptChunk::new(chunks.len(), &text[start..]));
    }

    Ok(chunks)
}
