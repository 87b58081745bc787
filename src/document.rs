//! In-memory document types produced by extraction and chunking.
//!
//! These live only for one pipeline invocation; nothing here is persisted
//! directly (the summary row carries the file name and URL).

use serde::{Deserialize, Serialize};

/// Metadata read from the PDF trailer's `Info` dictionary.
///
/// Every string field is optional: absence is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// Number of pages in the page tree.
    pub page_count: usize,
    /// Header version, e.g. "1.7".
    pub pdf_version: String,
}

/// A fetched and parsed PDF. Immutable after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub file_name: String,
    pub file_url: String,
    pub total_pages: usize,
    pub metadata: DocumentMetadata,
}

/// Text of a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageText {
    /// 1-indexed page number.
    pub page_number: usize,
    pub text: String,
}

/// Output of the extraction adapter: the document plus its pages in order.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub document: Document,
    pub pages: Vec<PageText>,
}

impl ExtractedDocument {
    /// Total characters of extracted text across pages.
    pub fn text_len(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Where a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Source page (1-indexed). A chunk never spans two pages.
    pub page_number: usize,
    /// Position of the chunk in the whole document's chunk sequence.
    pub chunk_index: usize,
}

/// A bounded, overlapping window of page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub page_content: String,
    pub metadata: ChunkMetadata,
}
