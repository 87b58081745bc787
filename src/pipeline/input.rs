//! Input resolution: fetch the PDF bytes behind a URL (or a local path).
//!
//! Everything stays in memory. lopdf parses from a byte slice, so unlike a
//! renderer that needs a file path there is no temp file to manage and no
//! disk write on the request path.
//!
//! Fetch failures are reported, never retried here: the caller decides
//! whether to wrap this in [`crate::retry::with_retry`].

use crate::error::PdfDeckError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Download `url` into memory.
///
/// # Errors
/// - [`PdfDeckError::FetchTimeout`] when the client timeout elapses
/// - [`PdfDeckError::FileFetch`] for transport errors and non-2xx statuses
pub async fn fetch_pdf(url: &str, timeout_secs: u64) -> Result<Vec<u8>, PdfDeckError> {
    info!("Fetching PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PdfDeckError::Internal(format!("HTTP client: {e}")))?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            PdfDeckError::FetchTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PdfDeckError::FileFetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    let status = response.status();
    if !status.is_success() {
        return Err(PdfDeckError::FileFetch {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
        });
    }

    let bytes = response.bytes().await.map_err(map_send_err)?;
    debug!("Fetched {} bytes from {}", bytes.len(), url);

    Ok(bytes.to_vec())
}

/// Read PDF bytes from a URL or a local file path.
pub async fn load_pdf_bytes(input: &str, timeout_secs: u64) -> Result<Vec<u8>, PdfDeckError> {
    if is_url(input) {
        return fetch_pdf(input, timeout_secs).await;
    }

    let path = PathBuf::from(input);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PdfDeckError::FileNotFound { path })
        }
        Err(e) => Err(PdfDeckError::Internal(format!(
            "Failed to read '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Best display name for an input: last URL path segment or file name,
/// with `.pdf` appended when the source name lacks it.
pub fn display_name(input: &str) -> String {
    with_pdf_suffix(raw_name(input))
}

fn raw_name(input: &str) -> String {
    if is_url(input) {
        if let Ok(parsed) = reqwest::Url::parse(input) {
            if let Some(mut segments) = parsed.path_segments() {
                if let Some(last) = segments.next_back() {
                    if !last.is_empty() {
                        return last.to_string();
                    }
                }
            }
        }
        return "document.pdf".to_string();
    }

    PathBuf::from(input)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document.pdf".to_string())
}

/// `name` unchanged if it already ends in `.pdf` (any case), else `name.pdf`.
pub fn with_pdf_suffix(name: String) -> String {
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{name}.pdf")
    }
}
