//! Result types returned by the summarization stage and the pipeline.

use serde::{Deserialize, Serialize};

/// Canonical output of the summarization client.
///
/// Every element of `slides` is a self-contained markdown string, and
/// `1 <= slides.len() <= 7` holds for every value the client returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub title: String,
    pub slides: Vec<String>,
    /// Whitespace-separated words in the *input* text.
    pub word_count: usize,
    /// Wall-clock milliseconds spent in the model call.
    pub processing_time_ms: u64,
    /// True when `slides` are placeholders rather than model output.
    #[serde(default)]
    pub fallback: bool,
}

/// Metadata block of the API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetadata {
    pub file_name: String,
    pub page_count: usize,
    pub word_count: usize,
    /// Extraction plus model time, in milliseconds.
    pub processing_time: u64,
}

/// What one pipeline invocation produces and the API returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSummary {
    pub title: String,
    pub slides: Vec<String>,
    pub metadata: SummaryMetadata,
}

/// Pipeline statistics for logging and the CLI's `--json` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub total_pages: usize,
    pub chunk_count: usize,
    pub extraction_ms: u64,
    pub summarization_ms: u64,
    pub used_fallback: bool,
}
