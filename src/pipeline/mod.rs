//! Pipeline stages for PDF-to-slides summarization.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and swapped (e.g. a different PDF backend) without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ chunk ──▶ summarize ──▶ postprocess
//! (reqwest)  (lopdf)   (1000/200)  (llm)       (cleanup)
//! ```
//!
//! 1. [`input`]: fetch the PDF bytes behind a URL (or read a local path)
//! 2. [`extract`]: parse pages and metadata; runs in `spawn_blocking`
//!    because lopdf is synchronous
//! 3. [`chunk`]: recursive 1000/200 character splitter, page by page
//! 4. [`summarize`]: one model call through [`llm::SummaryModel`], with
//!    layered parsing of the untrusted reply and placeholder fallbacks
//! 5. [`postprocess`]: deterministic cleanup of the reply and each slide

pub mod chunk;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod summarize;
