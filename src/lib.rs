//! # pdfdeck
//!
//! Turn a PDF into a short deck of markdown slides with an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF URL
//!  │
//!  ├─ 1. Fetch      download the bytes (reqwest, bounded timeout)
//!  ├─ 2. Extract    per-page text + Info metadata (lopdf, spawn_blocking)
//!  ├─ 3. Chunk      1000-char windows with 200-char overlap, per page
//!  ├─ 4. Summarize  one LLM call → {title, slides}, never fails
//!  └─ 5. Persist    SQLite row: pending → processing → completed | failed
//! ```
//!
//! Stored slides are read back through [`slides`], which understands every
//! shape older rows were written in.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfdeck::{process_document, LlmSummaryModel, NoopProgressSink, ProcessRequest, SummaryConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider from GEMINI_API_KEY / PDFDECK_LLM_PROVIDER / auto-detection
//!     let config = SummaryConfig::default();
//!     let model = Arc::new(LlmSummaryModel::from_config(&config)?);
//!     let request = ProcessRequest::new("https://arxiv.org/pdf/1706.03762", "attention.pdf");
//!     let summary = process_document(&request, &config, model, &NoopProgressSink).await?;
//!     println!("# {}", summary.title);
//!     for slide in &summary.slides {
//!         println!("\n---\n\n{slide}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfdeck` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfdeck = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod retry;
pub mod server;
pub mod slides;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServerConfig, SummaryConfig, SummaryConfigBuilder};
pub use document::{Chunk, ChunkMetadata, Document, DocumentMetadata, ExtractedDocument, PageText};
pub use error::{ErrorKind, PdfDeckError};
pub use output::{PipelineStats, ProcessedSummary, SummaryMetadata, SummaryResult};
pub use pipeline::llm::{LlmSummaryModel, ModelReply, SummaryModel};
pub use pipeline::summarize::Summarizer;
pub use process::{process_and_store, process_document, run_pipeline, ProcessRequest};
pub use progress::{ChannelProgressSink, NoopProgressSink, PipelineEvent, ProgressSink, Stage};
pub use retry::{Backoff, RetryPolicy};
pub use slides::{normalize_slides, normalize_summary_text, SlideShape};
pub use store::{SqliteStore, SummaryRepository, SummaryStatus};
