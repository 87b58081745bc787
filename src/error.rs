//! Error types for the pdfdeck library.
//!
//! A single fatal error type, [`PdfDeckError`], covers every stage of the
//! pipeline and the HTTP/persistence layers around it. Each variant belongs
//! to an [`ErrorKind`], which decides three things callers care about:
//!
//! * the HTTP status the API answers with ([`PdfDeckError::status_code`]),
//! * the message shown to end users ([`PdfDeckError::user_message`]), which
//!   never leaks internal detail,
//! * whether retrying can help ([`PdfDeckError::is_retryable`]).
//!
//! Summarization failures are deliberately *not* propagated out of the
//! summarization stage: [`crate::pipeline::summarize::Summarizer`] logs them
//! and returns placeholder slides instead. The `Summarization` variant exists
//! so the stage can classify and retry internally.

use std::path::PathBuf;
use thiserror::Error;

/// Broad error classes, mirroring how the API reports failures to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Request payload is incomplete or malformed.
    Upload,
    /// The document could not be fetched, parsed or summarised.
    Processing,
    /// No verified identity accompanied the request.
    Authentication,
    /// The file is not a PDF.
    FileType,
    /// The file is empty or too large.
    FileSize,
    /// Storage or internal failure.
    Api,
    /// Network-level failure talking to an upstream service.
    Network,
    /// The requested record does not exist for this user.
    NotFound,
}

/// All fatal errors returned by the pdfdeck library.
#[derive(Debug, Error)]
pub enum PdfDeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// HTTP download failed or returned a non-success status.
    #[error("Failed to fetch PDF from '{url}': {reason}")]
    FileFetch { url: String, reason: String },

    /// HTTP download exceeded the configured timeout.
    #[error("Fetching '{url}' timed out after {secs}s")]
    FetchTimeout { url: String, secs: u64 },

    /// Local input path does not exist (CLI only).
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The bytes do not start with the `%PDF` magic.
    #[error("Input is not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// lopdf could not parse the byte stream.
    #[error("PDF could not be parsed: {detail}")]
    FileParse { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// Model call failed or returned nothing usable.
    #[error("Summarization failed: {message}")]
    Summarization { message: String },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Request validation ────────────────────────────────────────────────
    /// Required fields are missing or empty.
    #[error("Missing required fields: {details}")]
    Validation { details: String },

    /// Only PDF uploads are accepted.
    #[error("Invalid file type for '{file_name}': only .pdf files are accepted")]
    FileType { file_name: String },

    /// File is empty or exceeds the size limit.
    #[error("Invalid file size {size} bytes (limit {limit} bytes)")]
    FileSize { size: u64, limit: u64 },

    /// No verified identity was supplied.
    #[error("Authentication required")]
    Authentication,

    /// Record does not exist (or belongs to someone else).
    #[error("Summary '{id}' not found")]
    NotFound { id: String },

    // ── Storage / serialisation ───────────────────────────────────────────
    /// Database query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Config / output ───────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not write the exported markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfDeckError {
    /// The class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileFetch { .. } | Self::FetchTimeout { .. } => ErrorKind::Network,
            Self::FileNotFound { .. }
            | Self::FileParse { .. }
            | Self::Summarization { .. }
            | Self::ProviderNotConfigured { .. } => ErrorKind::Processing,
            Self::NotAPdf { .. } | Self::FileType { .. } => ErrorKind::FileType,
            Self::FileSize { .. } => ErrorKind::FileSize,
            Self::Validation { .. } => ErrorKind::Upload,
            Self::Authentication => ErrorKind::Authentication,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Database(_)
            | Self::Serialization(_)
            | Self::InvalidConfig(_)
            | Self::OutputWriteFailed { .. }
            | Self::Internal(_) => ErrorKind::Api,
        }
    }

    /// HTTP status code the API answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Upload | ErrorKind::FileType | ErrorKind::FileSize => 400,
            ErrorKind::Authentication => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Processing | ErrorKind::Api | ErrorKind::Network => 500,
        }
    }

    /// Whether retrying the same operation might succeed.
    ///
    /// Client-input errors never are. A parse failure will fail the same way
    /// on the same bytes, so it is not retried either.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FileParse { .. } | Self::NotAPdf { .. } | Self::FileNotFound { .. } => false,
            Self::ProviderNotConfigured { .. } | Self::InvalidConfig(_) => false,
            _ => !matches!(
                self.kind(),
                ErrorKind::FileType
                    | ErrorKind::FileSize
                    | ErrorKind::Upload
                    | ErrorKind::Authentication
                    | ErrorKind::NotFound
            ),
        }
    }

    /// Human-readable message safe to show to end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::FileType { .. } | Self::NotAPdf { .. } => "Please upload only PDF files.".into(),
            Self::FileSize { size: 0, .. } => {
                "The uploaded file is empty. Please select a valid PDF file.".into()
            }
            Self::FileSize { limit, .. } => {
                format!("File size must be less than {}.", format_file_size(*limit))
            }
            Self::Validation { details } => format!("Missing required fields: {details}"),
            Self::Authentication => "Please sign in again to continue.".into(),
            Self::NotFound { .. } => "The requested summary could not be found.".into(),
            Self::FetchTimeout { .. } => "The request is taking too long. Please try again.".into(),
            Self::FileFetch { .. } => {
                "We could not download your file. Please try uploading it again.".into()
            }
            Self::FileParse { .. } | Self::FileNotFound { .. } => {
                "We could not read this PDF. Please check the file and try again.".into()
            }
            _ => "An unexpected error occurred. Please try again.".into(),
        }
    }
}

/// Format a byte count the way upload limits are shown to users.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
