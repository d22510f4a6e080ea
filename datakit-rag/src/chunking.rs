//! Splitting document content into chunks before embedding.
//!
//! [`RecursiveChunker`] tries coarse separators first (paragraphs, then
//! lines, then words, then single characters), merging adjacent pieces back
//! together up to `chunk_size` characters and carrying up to `chunk_overlap`
//! characters of trailing pieces into the next chunk.

use std::collections::VecDeque;

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// A strategy for splitting text into chunk-sized pieces.
///
/// Implementations return plain text; embeddings and metadata are attached
/// later by [`RagService`](crate::RagService).
pub trait Chunker: Send + Sync {
    /// Split `content` into chunks. Returns an empty `Vec` for empty content.
    fn chunk(&self, content: &str) -> Vec<String>;
}

/// Separators tried in order. The empty separator splits into characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Lengths are counted in `char`s, so a chunk never ends inside a UTF-8 code
/// point, and no chunk is longer than `chunk_size`.
///
/// # Example
///
/// ```rust
/// use datakit_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(10, 4).unwrap();
/// let chunks = chunker.chunk("one two three four");
/// assert!(chunks.iter().all(|c| c.chars().count() <= 10));
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_size` is zero or
    /// `chunk_overlap` is not smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ChunkingError("chunk_size must be greater than zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ChunkingError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker using the sizes from `config`.
    ///
    /// # Errors
    ///
    /// See [`RecursiveChunker::new`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);
        let pieces = split_on(text, separator);

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    /// Join small pieces into chunks of at most `chunk_size` characters.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { separator_len };
            if total + len + joiner > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window, separator);
                // Drop leading pieces until only the overlap remains and the
                // next piece fits.
                while total > self.chunk_overlap
                    || (total > 0
                        && total + len + if window.is_empty() { 0 } else { separator_len }
                            > self.chunk_size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if window.is_empty() { 0 } else { separator_len };
                }
            }
            if !window.is_empty() {
                total += separator_len;
            }
            window.push_back(piece);
            total += len;
        }
        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        let config = RagConfig::default();
        Self { chunk_size: config.chunk_size, chunk_overlap: config.chunk_overlap }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, content: &str) -> Vec<String> {
        if content.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(content, &SEPARATORS)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Choose the first separator present in `text`, returning it and the finer ones after it.
fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator) {
            return (*separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn split_on<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
    } else {
        text.split(separator).filter(|piece| !piece.is_empty()).collect()
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
