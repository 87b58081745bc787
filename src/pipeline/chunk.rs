//! Chunking: split page text into bounded, overlapping windows.
//!
//! ## Algorithm
//!
//! A recursive character splitter. The coarsest separator present in the
//! text ("\n\n" first, single characters last) cuts it into pieces; each
//! separator stays attached to the piece that follows it. Pieces that fit
//! are merged greedily into windows of at most [`CHUNK_SIZE`] characters.
//! When a window is emitted, pieces are dropped from the front of the merge
//! buffer until no more than [`CHUNK_OVERLAP`] characters remain, and those
//! survivors open the next window. Pieces that are themselves too large are
//! split again with the next finer separator.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text obeys the
//! same window as ASCII.

use crate::document::{Chunk, ChunkMetadata, PageText};
use tracing::debug;

/// Maximum characters per chunk.
pub const CHUNK_SIZE: usize = 1000;

/// Characters shared between consecutive chunks of one page.
pub const CHUNK_OVERLAP: usize = 200;

/// Separators tried in order; `""` means "split into characters".
pub const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " ", ""];

/// Recursive splitter with a configurable window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursiveSplitter {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
        }
    }
}

impl RecursiveSplitter {
    /// Split `text` into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut finer: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                break;
            }
            if text.contains(sep) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                if let Some(c) = trimmed(piece) {
                    chunks.push(c);
                }
            } else {
                chunks.extend(self.split_with(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }
        chunks
    }

    /// Greedily merge small pieces into windows, carrying an overlap tail.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        let mut window: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(c) = join_window(&window) {
                    out.push(c);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if let Some(c) = join_window(&window) {
            out.push(c);
        }
        out
    }
}

/// Split the text of one document into chunks with the default window.
pub fn split_text(text: &str) -> Vec<String> {
    RecursiveSplitter::default().split(text)
}

/// Split every page independently. Chunks never cross a page boundary and
/// `chunk_index` counts across the whole document.
pub fn split_pages(pages: &[PageText]) -> Vec<Chunk> {
    let splitter = RecursiveSplitter::default();
    let mut chunks = Vec::new();

    for page in pages {
        for content in splitter.split(&page.text) {
            let chunk_index = chunks.len();
            chunks.push(Chunk {
                page_content: content,
                metadata: ChunkMetadata {
                    page_number: page.page_number,
                    chunk_index,
                },
            });
        }
    }

    debug!("Split {} pages into {} chunks", pages.len(), chunks.len());
    chunks
}

/// Concatenate chunk text with blank lines; this is the model input.
pub fn join_chunks(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Chunks whose text contains `query`, case-insensitively.
pub fn search_chunks<'a>(chunks: &'a [Chunk], query: &str) -> Vec<&'a Chunk> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    chunks
        .iter()
        .filter(|c| c.page_content.to_lowercase().contains(&needle))
        .collect()
}

/// All chunk text belonging to `page_number`, joined with blank lines.
pub fn page_text(chunks: &[Chunk], page_number: usize) -> String {
    chunks
        .iter()
        .filter(|c| c.metadata.page_number == page_number)
        .map(|c| c.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn trimmed(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn join_window(window: &std::collections::VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    trimmed(&joined)
}

/// Cut `text` before every occurrence of `separator`. An empty separator
/// yields one piece per character.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
