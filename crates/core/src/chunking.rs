use crate::error::IngestError;
use crate::models::{IngestionOptions, TextChunk};

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1_000,
            overlap_chars: 200,
        }
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.max_chunk_chars,
            overlap_chars: value.overlap_chars,
        }
    }
}

/// Split `text` into ordered chunks of at most `max_chars` chars, with up
/// to `overlap_chars` of trailing context repeated at the start of the
/// next chunk. Cuts prefer paragraph, line, sentence, and word boundaries
/// over mid-token cuts; a hard cut is the last resort.
///
/// Each chunk records its char offset into `text`, so the original can be
/// reconstructed exactly by dropping the overlapping prefix of each chunk.
/// Empty (or whitespace-only) input yields an empty sequence.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<TextChunk>, IngestError> {
    if config.max_chars == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "max_chars must be positive".to_string(),
        ));
    }
    if config.overlap_chars >= config.max_chars {
        return Err(IngestError::InvalidChunkConfig(format!(
            "overlap {} must be smaller than max chunk size {}",
            config.overlap_chars, config.max_chars
        )));
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut prev_end = 0usize;
    let mut index = 0usize;

    loop {
        let window_end = (start + config.max_chars).min(chars.len());
        let end = if window_end == chars.len() {
            window_end
        } else {
            find_split(&chars, start, window_end, prev_end)
        };

        chunks.push(TextChunk {
            index,
            start,
            text: chars[start..end].iter().collect(),
        });
        index += 1;

        if end == chars.len() {
            break;
        }

        // Step back by the overlap, but always make forward progress.
        let step_back = config.overlap_chars.min(end - start - 1);
        prev_end = end;
        start = end - step_back;
    }

    Ok(chunks)
}

/// Best cut position in `(floor, window_end]`, preferring the latest
/// natural boundary inside the window. `floor` is the previous chunk's
/// end: a cut at or before it would emit text already fully covered, so
/// such boundaries are skipped in favor of a later one, a lower boundary
/// class, or the hard cut. The hard cut always clears the floor because
/// the window start steps back by less than `max_chars`.
fn find_split(chars: &[char], start: usize, window_end: usize, floor: usize) -> usize {
    // Paragraph break: cut just after a blank line.
    for i in (start..window_end.saturating_sub(1)).rev() {
        if chars[i] == '\n' && chars[i + 1] == '\n' && i + 2 > floor {
            return i + 2;
        }
    }

    // Line break.
    for i in (start..window_end).rev() {
        if chars[i] == '\n' && i + 1 > floor {
            return i + 1;
        }
    }

    // Sentence end: terminator followed by whitespace (or the window edge).
    for i in (start..window_end).rev() {
        let is_terminator = matches!(chars[i], '.' | '!' | '?');
        let followed_by_space = i + 1 == window_end || chars[i + 1].is_whitespace();
        if is_terminator && followed_by_space && i + 1 > floor {
            return i + 1;
        }
    }

    // Word boundary.
    for i in (start..window_end).rev() {
        if chars[i].is_whitespace() && i + 1 > floor {
            return i + 1;
        }
    }

    // No usable boundary in the window: hard cut.
    window_end
}
