//! Chunk types and the overlapping-window splitter

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A contiguous slice of one indexed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexChunk {
    /// Path relative to the index root, `/`-separated
    pub path: String,
    /// Byte offsets of `text` within the file
    pub byte_range: Range<usize>,
    /// Chunk text
    pub text: String,
    /// Embedding vector, when produced by an embedding backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A chunk with its relevance to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The matched chunk
    pub chunk: IndexChunk,
    /// Relevance (higher is better, comparable only within one query)
    pub score: f32,
}

/// Split `content` into windows of about `chunk_size` characters that
/// overlap by `overlap` characters.
///
/// Window ends snap back to the last newline in the final fifth of the
/// window when there is one, so chunks tend to end on line boundaries.
#[must_use]
pub fn split_into_chunks(
    path: &str,
    content: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<IndexChunk> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size.saturating_sub(1));

    // Byte offset of every char boundary, plus the end of the text.
    let mut bounds: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
    bounds.push(content.len());
    let char_len = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < char_len {
        let mut end = (start + chunk_size).min(char_len);

        if end < char_len {
            let floor = end - chunk_size / 5;
            let window = &content[bounds[floor]..bounds[end]];
            if let Some(pos) = window.rfind('\n') {
                let snapped = floor + window[..=pos].chars().count();
                if snapped > start {
                    end = snapped;
                }
            }
        }

        let text = &content[bounds[start]..bounds[end]];
        if !text.trim().is_empty() {
            chunks.push(IndexChunk {
                path: path.to_string(),
                byte_range: bounds[start]..bounds[end],
                text: text.to_string(),
                embedding: None,
            });
        }

        if end == char_len {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}
