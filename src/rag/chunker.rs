// Boundary-preferring text chunker.
//
// Splits extracted document text into bounded, ordered pieces. Split points
// prefer paragraph breaks, then sentence ends, then whitespace, and fall
// back to a hard character cut only when no boundary exists inside the size
// budget. Each piece carries the overlap it repeats from its predecessor so
// the sequence stays lossless: concatenating every piece minus its overlap
// prefix reproduces the input exactly.

use regex::Regex;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Hard upper bound on a produced chunk, in bytes of UTF-8 text.
    pub max_chunk_size: usize,
    /// Length of predecessor text repeated at the head of each chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// One produced chunk. `content` includes the overlap prefix;
/// `overlap_len` is its byte length (0 for the first chunk).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPiece {
    pub index: usize,
    pub content: String,
    pub overlap_len: usize,
}

impl ChunkPiece {
    /// The part of this chunk that is new relative to its predecessor.
    pub fn new_text(&self) -> &str {
        &self.content[self.overlap_len..]
    }
}

pub struct Chunker {
    config: ChunkerConfig,
    paragraph_pattern: Regex,
    sentence_pattern: Regex,
}

/// Smallest per-chunk byte budget after the overlap prefix. Any UTF-8 char
/// is at most 4 bytes, so a budget of at least 4 guarantees the hard cut
/// always lands within the size bound.
const MIN_CHUNK_BUDGET: usize = 4;

impl Chunker {
    pub fn new(config: ChunkerConfig) -> CoreResult<Self> {
        if config.max_chunk_size == 0 {
            return Err(CoreError::Configuration(
                "chunk size cannot be zero".to_string(),
            ));
        }
        if config.chunk_overlap >= config.max_chunk_size
            || config.max_chunk_size - config.chunk_overlap < MIN_CHUNK_BUDGET
        {
            return Err(CoreError::Configuration(format!(
                "chunk size must exceed overlap by at least {} bytes",
                MIN_CHUNK_BUDGET
            )));
        }
        Ok(Self {
            config,
            paragraph_pattern: Regex::new(r"\n\s*\n").expect("static pattern"),
            sentence_pattern: Regex::new(r"[.!?]+\s").expect("static pattern"),
        })
    }

    pub fn split(&self, text: &str) -> Vec<ChunkPiece> {
        if text.is_empty() {
            return vec![];
        }
        if text.len() <= self.config.max_chunk_size {
            return vec![ChunkPiece {
                index: 0,
                content: text.to_string(),
                overlap_len: 0,
            }];
        }

        let mut pieces = Vec::new();
        let mut pos = 0usize;
        let mut overlap = String::new();

        while pos < text.len() {
            let budget = self.config.max_chunk_size - overlap.len();
            let remaining = &text[pos..];

            let take = if remaining.len() <= budget {
                remaining.len()
            } else {
                self.split_point(remaining, budget)
            };

            let body = &remaining[..take];
            let overlap_len = overlap.len();
            let mut content = std::mem::take(&mut overlap);
            content.push_str(body);

            overlap = tail_within(body, self.config.chunk_overlap).to_string();
            pieces.push(ChunkPiece {
                index: pieces.len(),
                content,
                overlap_len,
            });
            pos += take;
        }

        pieces
    }

    /// Byte offset to cut `text` at, at most `budget` bytes in. Prefers the
    /// last paragraph break inside the window, then the last sentence end,
    /// then the last whitespace, then a hard cut on a char boundary.
    fn split_point(&self, text: &str, budget: usize) -> usize {
        let window_end = floor_char_boundary(text, budget);
        debug_assert!(window_end > 0, "budget smaller than first char");
        let window = &text[..window_end];

        if let Some(m) = self.paragraph_pattern.find_iter(window).last() {
            if m.end() > 0 {
                return m.end();
            }
        }
        if let Some(m) = self.sentence_pattern.find_iter(window).last() {
            if m.end() > 0 {
                return m.end();
            }
        }
        if let Some((idx, ch)) = window
            .char_indices()
            .rev()
            .find(|(_, ch)| ch.is_whitespace())
        {
            let after = idx + ch.len_utf8();
            if after > 0 && after < window_end {
                return after;
            }
        }
        window_end
    }
}

/// Largest suffix of `text` that fits in `max_len` bytes, starting on a
/// char boundary.
fn tail_within(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut start = text.len() - max_len;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Largest byte index `<= at` lying on a char boundary, but never 0 for a
/// non-empty string (progress guarantee for the hard cut).
fn floor_char_boundary(text: &str, at: usize) -> usize {
    if at >= text.len() {
        return text.len();
    }
    let mut idx = at;
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    if idx == 0 {
        // A single char wider than the budget still has to make progress.
        text.chars()
            .next()
            .map(|ch| ch.len_utf8())
            .unwrap_or(text.len())
    } else {
        idx
    }
}
