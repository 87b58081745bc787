//! Summarization: one model call that turns document text into a slide deck.
//!
//! ## Untrusted output
//!
//! The reply is free text that is *supposed* to be `{"title", "slides"}`
//! JSON. In practice it arrives fenced, truncated mid-string, with slides as
//! objects instead of strings, or as prose. [`parse_response`] degrades
//! through these layers:
//!
//! 1. strip code fences, parse JSON
//! 2. parse the outermost `{...}` slice (prose around the JSON)
//! 3. regex extraction of `"title"` and the string literals in `"slides"`
//! 4. [`UNPARSEABLE_FALLBACK_SLIDES`]
//!
//! ## Never fails
//!
//! [`Summarizer::summarize`] returns a [`SummaryResult`], not a `Result`.
//! Model errors are retried per the configured policy, logged, and turned
//! into [`MODEL_ERROR_FALLBACK_SLIDES`]. The caller persists whatever comes
//! back and the user can re-run the document later.

use crate::config::SummaryConfig;
use crate::output::SummaryResult;
use crate::pipeline::llm::SummaryModel;
use crate::pipeline::postprocess::{strip_code_fences, tidy_slide};
use crate::prompts::{build_summary_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::retry::{with_retry, RetryPolicy};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Hard upper bound on slides in any [`SummaryResult`].
pub const MAX_SLIDES: usize = 7;

/// The single slide used when a reply parsed but carried no slides.
pub const EMPTY_SLIDES_MESSAGE: &str = "Summary unavailable - please try again.";

/// Placeholder deck when the reply could not be parsed at all.
pub const UNPARSEABLE_FALLBACK_SLIDES: [&str; 4] = [
    "This document contains important information that requires further analysis.",
    "The content covers various topics that need detailed examination.",
    "Key insights and findings are present throughout the document.",
    "The document provides valuable information for understanding the subject matter.",
];

/// Placeholder deck when the model call itself failed.
pub const MODEL_ERROR_FALLBACK_SLIDES: [&str; 4] = [
    "This document has been processed but summarization encountered an error.",
    "The content appears to contain important information that requires review.",
    "Manual analysis may be needed to extract key insights.",
    "Please try uploading the document again for better results.",
];

/// Extracted string literals this short are treated as noise.
const MIN_EXTRACTED_SLIDE_CHARS: usize = 10;

/// Title used whenever the model did not supply one.
pub fn fallback_title(file_name: &str) -> String {
    format!("Summary of {}", file_name)
}

/// Runs the summarization call against a [`SummaryModel`].
#[derive(Clone)]
pub struct Summarizer {
    model: Arc<dyn SummaryModel>,
    system_prompt: String,
    min_slides: usize,
    max_slides: usize,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("min_slides", &self.min_slides)
            .field("max_slides", &self.max_slides)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Summarizer {
    pub fn new(model: Arc<dyn SummaryModel>, config: &SummaryConfig) -> Self {
        Self {
            model,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            min_slides: config.min_slides,
            max_slides: config.max_slides.min(MAX_SLIDES),
            retry: RetryPolicy::exponential(config.max_retries, config.retry_backoff_ms),
        }
    }

    /// Summarize `text` into a titled deck of 1 to [`MAX_SLIDES`] slides.
    pub async fn summarize(&self, text: &str, file_name: &str) -> SummaryResult {
        let word_count = text.split_whitespace().count();
        let prompt = build_summary_prompt(text, file_name, self.min_slides, self.max_slides);
        let start = Instant::now();

        info!(
            "Summarizing {} ({} words, {} chars)",
            file_name,
            word_count,
            text.chars().count()
        );

        let reply = with_retry(&self.retry, "summarize", |_| {
            self.model.generate(&self.system_prompt, &prompt)
        })
        .await;

        let parsed = match reply {
            Ok(reply) => {
                debug!(
                    "Model returned {} chars ({} prompt / {} completion tokens)",
                    reply.content.len(),
                    reply.prompt_tokens,
                    reply.completion_tokens
                );
                parse_response(&reply.content)
            }
            Err(e) => {
                error!("Summarization failed for {}: {}", file_name, e);
                ParsedReply::fallback(&MODEL_ERROR_FALLBACK_SLIDES)
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let result = finish(parsed, file_name, word_count, elapsed_ms);
        info!(
            "Summary ready: \"{}\" with {} slides in {}ms{}",
            result.title,
            result.slides.len(),
            result.processing_time_ms,
            if result.fallback { " (fallback)" } else { "" }
        );
        result
    }
}

/// A model reply reduced to a title and slide strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub title: Option<String>,
    pub slides: Vec<String>,
    /// True when `slides` are placeholders.
    pub fallback: bool,
}

impl ParsedReply {
    fn fallback(slides: &[&str]) -> Self {
        Self {
            title: None,
            slides: slides.iter().map(|s| s.to_string()).collect(),
            fallback: true,
        }
    }
}

/// Turn raw reply text into a [`ParsedReply`]. See the module docs for the
/// layers tried.
pub fn parse_response(raw: &str) -> ParsedReply {
    let cleaned = strip_code_fences(raw);

    if let Some(parsed) = parse_json_deck(&cleaned) {
        return parsed;
    }

    if let (Some(open), Some(close)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if open < close {
            if let Some(parsed) = parse_json_deck(&cleaned[open..=close]) {
                debug!("Parsed JSON embedded in surrounding text");
                return parsed;
            }
        }
    }

    warn!("Model reply is not valid JSON, attempting manual extraction");
    if let Some(parsed) = extract_manually(&cleaned) {
        return parsed;
    }

    warn!("Manual extraction found no slides, using placeholder deck");
    ParsedReply::fallback(&UNPARSEABLE_FALLBACK_SLIDES)
}

fn parse_json_deck(text: &str) -> Option<ParsedReply> {
    let value: Value = serde_json::from_str(text).ok()?;
    match value {
        Value::Object(map) => {
            let title = map
                .get("title")
                .and_then(Value::as_str)
                .map(|t| t.trim().to_string());
            let slides = match map.get("slides") {
                Some(Value::Array(items)) => items.iter().map(coerce_slide).collect(),
                Some(Value::Null) | None => Vec::new(),
                Some(other) => vec![coerce_slide(other)],
            };
            Some(ParsedReply {
                title,
                slides,
                fallback: false,
            })
        }
        Value::Array(items) => Some(ParsedReply {
            title: None,
            slides: items.iter().map(coerce_slide).collect(),
            fallback: false,
        }),
        _ => None,
    }
}

// ── Manual extraction ────────────────────────────────────────────────────────

static RE_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""title"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid regex")
});

static RE_SLIDES_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""slides"\s*:\s*\["#).expect("valid regex"));

static RE_STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("valid regex"));

/// Best-effort recovery from broken JSON, e.g. a reply cut off by the token
/// limit. Only complete string literals are recovered.
fn extract_manually(text: &str) -> Option<ParsedReply> {
    let title = RE_TITLE
        .captures(text)
        .map(|c| unescape_literal(&c[1]).trim().to_string())
        .filter(|t| !t.is_empty());

    let start = RE_SLIDES_START.find(text)?.end();
    let tail = &text[start..];
    let body = match tail.rfind(']') {
        Some(end) => &tail[..end],
        None => tail,
    };

    let slides: Vec<String> = RE_STRING_LITERAL
        .captures_iter(body)
        .map(|c| unescape_literal(&c[1]))
        .filter(|s| s.chars().count() > MIN_EXTRACTED_SLIDE_CHARS)
        .collect();

    if slides.is_empty() {
        return None;
    }
    debug!("Manually extracted {} slides", slides.len());
    Some(ParsedReply {
        title,
        slides,
        fallback: false,
    })
}

/// Decode JSON escapes in a string literal body. Falls back to the common
/// escapes when the literal is not valid JSON on its own.
fn unescape_literal(body: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", body)).unwrap_or_else(|_| {
        body.replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    })
}

// ── Slide coercion ───────────────────────────────────────────────────────────

const TITLE_KEYS: [&str; 3] = ["title", "slide_title", "heading"];

/// Render one slide element of a parsed reply as markdown.
///
/// Objects are resolved field by field: `slide`, then `content` (under a
/// `slide_title`/`title` heading when present), `text`, `summary`, a bare
/// `slide_title` heading, and finally every field as `**key**: value`.
pub fn coerce_slide(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => {
            let field = |key: &str| map.get(key).and_then(Value::as_str);

            if let Some(slide) = field("slide") {
                return slide.to_string();
            }
            let heading = field("slide_title").or_else(|| field("title"));
            if let Some(content) = field("content") {
                return match heading {
                    Some(h) => format!("# {}\n\n{}", h, content),
                    None => content.to_string(),
                };
            }
            if let Some(text) = field("text") {
                return text.to_string();
            }
            if let Some(summary) = field("summary") {
                return summary.to_string();
            }
            if let Some(h) = field("slide_title") {
                return format!("# {}", h);
            }

            map.iter()
                .map(|(key, v)| {
                    let shown = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    if TITLE_KEYS.contains(&key.as_str()) {
                        format!("# {}", shown)
                    } else {
                        format!("**{}**: {}", key, shown)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        }
        other => other.to_string(),
    }
}

/// Apply the output invariants: a non-empty title, tidied non-empty slides,
/// at most [`MAX_SLIDES`], at least one.
fn finish(
    parsed: ParsedReply,
    file_name: &str,
    word_count: usize,
    elapsed_ms: u64,
) -> SummaryResult {
    let title = parsed
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title(file_name));

    let mut slides: Vec<String> = parsed
        .slides
        .iter()
        .map(|s| tidy_slide(s))
        .filter(|s| !s.is_empty())
        .collect();

    if slides.len() > MAX_SLIDES {
        debug!("Truncating {} slides to {}", slides.len(), MAX_SLIDES);
        slides.truncate(MAX_SLIDES);
    }
    if slides.is_empty() {
        slides.push(EMPTY_SLIDES_MESSAGE.to_string());
    }

    SummaryResult {
        title,
        slides,
        word_count,
        processing_time_ms: elapsed_ms,
        fallback: parsed.fallback,
    }
}
