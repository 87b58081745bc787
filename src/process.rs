//! Pipeline orchestration: one document from URL to slide deck.
//!
//! ## Pipeline Stages
//!
//! ```text
//! ┌──────────┐   ┌────────┐   ┌─────────┐   ┌───────────┐   ┌─────────┐
//! │  Fetch   │──▶│ Parse  │──▶│  Chunk  │──▶│ Summarize │──▶│ Persist │
//! │ (reqwest)│   │(lopdf) │   │1000/200 │   │   (LLM)   │   │ (sqlx)  │
//! └──────────┘   └────────┘   └─────────┘   └───────────┘   └─────────┘
//! ```
//!
//! Stages run strictly in sequence for a single document; there is no
//! fan-out over pages or chunks. Fetch and parse together form the
//! extraction step, which is wrapped in the configured retry policy.
//! Summarization never fails (see [`crate::pipeline::summarize`]), so the
//! only errors out of [`process_document`] are validation and extraction
//! errors.
//!
//! [`process_document`] stops after summarization and does not emit
//! [`Stage::Complete`]; [`process_and_store`] adds the persist step and the
//! terminal event.

use crate::config::{SummaryConfig, MAX_UPLOAD_BYTES};
use crate::document::{Document, ExtractedDocument};
use crate::error::PdfDeckError;
use crate::output::{PipelineStats, ProcessedSummary, SummaryMetadata};
use crate::pipeline::{chunk, extract, input, llm::SummaryModel, summarize::Summarizer};
use crate::progress::{PipelineEvent, ProgressSink, Stage};
use crate::retry::with_retry;
use crate::store::{NewSummary, SummaryRepository, SummaryStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Body of a process-and-summarize request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    /// Where the PDF can be downloaded (or, from the CLI, a local path).
    #[serde(default)]
    pub file_url: String,
    /// Display name of the upload; must end in `.pdf`.
    #[serde(default)]
    pub file_name: String,
    /// Upload-service key, kept for log correlation.
    #[serde(default)]
    pub file_key: Option<String>,
}

impl ProcessRequest {
    pub fn new(file_url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_url: file_url.into(),
            file_name: file_name.into(),
            file_key: None,
        }
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub summary: ProcessedSummary,
    pub stats: PipelineStats,
    pub document: Document,
}

/// A completed run that has been persisted.
#[derive(Debug, Clone)]
pub struct StoredOutcome {
    pub id: String,
    pub outcome: ProcessOutcome,
}

/// Check required fields and the file type.
pub fn validate_request(request: &ProcessRequest) -> Result<(), PdfDeckError> {
    let mut missing = Vec::new();
    if request.file_url.trim().is_empty() {
        missing.push("fileUrl");
    }
    if request.file_name.trim().is_empty() {
        missing.push("fileName");
    }
    if !missing.is_empty() {
        return Err(PdfDeckError::Validation {
            details: missing.join(", "),
        });
    }

    if !request.file_name.trim().to_ascii_lowercase().ends_with(".pdf") {
        return Err(PdfDeckError::FileType {
            file_name: request.file_name.clone(),
        });
    }
    Ok(())
}

/// Reject empty and oversized downloads.
pub fn validate_pdf_size(len: usize) -> Result<(), PdfDeckError> {
    let size = len as u64;
    if size == 0 || size > MAX_UPLOAD_BYTES {
        return Err(PdfDeckError::FileSize {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Run fetch, parse, chunk and summarize for one document.
pub async fn process_document(
    request: &ProcessRequest,
    config: &SummaryConfig,
    model: Arc<dyn SummaryModel>,
    sink: &dyn ProgressSink,
) -> Result<ProcessedSummary, PdfDeckError> {
    run_pipeline(request, config, model, sink)
        .await
        .map(|outcome| outcome.summary)
}

/// [`process_document`] returning stats and document metadata as well.
pub async fn run_pipeline(
    request: &ProcessRequest,
    config: &SummaryConfig,
    model: Arc<dyn SummaryModel>,
    sink: &dyn ProgressSink,
) -> Result<ProcessOutcome, PdfDeckError> {
    let result = run_stages(request, config, model, sink).await;
    if let Err(ref e) = result {
        error!("Processing {} failed: {}", request.file_name, e);
        sink.on_event(&PipelineEvent::with_message(Stage::Failed, e.user_message()));
    }
    result
}

async fn run_stages(
    request: &ProcessRequest,
    config: &SummaryConfig,
    model: Arc<dyn SummaryModel>,
    sink: &dyn ProgressSink,
) -> Result<ProcessOutcome, PdfDeckError> {
    validate_request(request)?;
    info!(
        "Processing {} from {}{}",
        request.file_name,
        request.file_url,
        request
            .file_key
            .as_deref()
            .map(|k| format!(" (key {k})"))
            .unwrap_or_default()
    );

    // ── Step 1: Fetch + parse, with retry ────────────────────────────────
    let extraction_start = Instant::now();
    let url: &str = &request.file_url;
    let name: &str = &request.file_name;
    let timeout = config.download_timeout_secs;

    let extracted: ExtractedDocument =
        with_retry(&config.extraction_retry, "extract", move |attempt| async move {
            if attempt > 1 {
                warn!("Extraction attempt {} for {}", attempt, name);
            }
            sink.on_event(&PipelineEvent::new(Stage::Fetching));
            let bytes = input::load_pdf_bytes(url, timeout).await?;
            validate_pdf_size(bytes.len())?;

            sink.on_event(&PipelineEvent::new(Stage::Parsing));
            extract::parse_pdf(bytes, name, url).await
        })
        .await?;
    let extraction_ms = extraction_start.elapsed().as_millis() as u64;

    // ── Step 2: Chunk ────────────────────────────────────────────────────
    sink.on_event(&PipelineEvent::new(Stage::Chunking));
    let chunks = chunk::split_pages(&extracted.pages);
    let full_text = chunk::join_chunks(&chunks);
    info!(
        "{}: {} pages, {} chunks, {} chars",
        name,
        extracted.document.total_pages,
        chunks.len(),
        full_text.chars().count()
    );

    // ── Step 3: Summarize ────────────────────────────────────────────────
    sink.on_event(&PipelineEvent::new(Stage::Summarizing));
    let result = Summarizer::new(model, config).summarize(&full_text, name).await;

    let page_count = if extracted.document.total_pages > 0 {
        extracted.document.total_pages
    } else {
        chunks.len()
    };

    let summary = ProcessedSummary {
        title: result.title,
        slides: result.slides,
        metadata: SummaryMetadata {
            file_name: name.to_string(),
            page_count,
            word_count: result.word_count,
            processing_time: extraction_ms + result.processing_time_ms,
        },
    };

    let stats = PipelineStats {
        total_pages: extracted.document.total_pages,
        chunk_count: chunks.len(),
        extraction_ms,
        summarization_ms: result.processing_time_ms,
        used_fallback: result.fallback,
    };

    Ok(ProcessOutcome {
        summary,
        stats,
        document: extracted.document,
    })
}

/// Full request lifecycle against a store: open a `pending` row, mark it
/// `processing`, run the pipeline, then store the deck as `completed` or
/// mark the row `failed`.
pub async fn process_and_store(
    store: &dyn SummaryRepository,
    user_id: &str,
    request: &ProcessRequest,
    config: &SummaryConfig,
    model: Arc<dyn SummaryModel>,
    sink: &dyn ProgressSink,
) -> Result<StoredOutcome, PdfDeckError> {
    validate_request(request)?;

    let row = store
        .create_summary(NewSummary {
            user_id: user_id.to_string(),
            original_file_url: request.file_url.clone(),
            file_name: request.file_name.clone(),
        })
        .await?;
    if let Err(e) = store.set_status(&row.id, SummaryStatus::Processing).await {
        mark_failed(store, &row.id).await;
        sink.on_event(&PipelineEvent::with_message(Stage::Failed, e.user_message()));
        return Err(e);
    }

    let outcome = match run_pipeline(request, config, model, sink).await {
        Ok(outcome) => outcome,
        Err(e) => {
            mark_failed(store, &row.id).await;
            return Err(e);
        }
    };

    sink.on_event(&PipelineEvent::new(Stage::Persisting));
    if let Err(e) = store
        .complete_summary(&row.id, &outcome.summary.title, &outcome.summary.slides)
        .await
    {
        error!("Could not store summary {}: {}", row.id, e);
        mark_failed(store, &row.id).await;
        sink.on_event(&PipelineEvent::with_message(Stage::Failed, e.user_message()));
        return Err(e);
    }

    sink.on_event(&PipelineEvent::new(Stage::Complete));
    info!("Summary {} stored for {}", row.id, request.file_name);
    Ok(StoredOutcome {
        id: row.id,
        outcome,
    })
}

/// Best-effort move of a row to `failed`; a second storage error is only
/// logged so the original error reaches the caller.
async fn mark_failed(store: &dyn SummaryRepository, id: &str) {
    if let Err(db_err) = store.set_status(id, SummaryStatus::Failed).await {
        error!("Could not mark summary {} failed: {}", id, db_err);
    }
}
