//! Text extraction: parse PDF bytes into per-page text plus metadata.
//!
//! ## Why spawn_blocking?
//!
//! lopdf decompresses content streams and walks every page's operators
//! synchronously. For a few hundred pages that is tens of milliseconds of
//! pure CPU, which must not run on a Tokio worker thread.
//!
//! ## Failure policy
//!
//! A document that lopdf cannot load is a [`PdfDeckError::FileParse`]. A
//! single page whose text cannot be decoded (exotic font encodings, image-only
//! scans) is *not* fatal: it contributes an empty string and a warning, and
//! the chunking stage skips it.

use crate::document::{Document, DocumentMetadata, ExtractedDocument, PageText};
use crate::error::PdfDeckError;
use crate::pipeline::input;
use lopdf::{Dictionary, Object};
use tracing::{debug, info, warn};

/// Fetch `file_url` and parse it. Composes [`input::fetch_pdf`] and [`parse_pdf`].
pub async fn extract_document(
    file_url: &str,
    file_name: &str,
    timeout_secs: u64,
) -> Result<ExtractedDocument, PdfDeckError> {
    let bytes = input::fetch_pdf(file_url, timeout_secs).await?;
    parse_pdf(bytes, file_name, file_url).await
}

/// Parse an in-memory PDF on the blocking pool.
pub async fn parse_pdf(
    bytes: Vec<u8>,
    file_name: &str,
    file_url: &str,
) -> Result<ExtractedDocument, PdfDeckError> {
    let file_name = file_name.to_string();
    let file_url = file_url.to_string();

    tokio::task::spawn_blocking(move || parse_pdf_blocking(&bytes, file_name, file_url))
        .await
        .map_err(|e| PdfDeckError::Internal(format!("Parse task panicked: {}", e)))?
}

/// Blocking implementation of [`parse_pdf`].
pub fn parse_pdf_blocking(
    bytes: &[u8],
    file_name: String,
    file_url: String,
) -> Result<ExtractedDocument, PdfDeckError> {
    check_magic(bytes)?;

    let doc = lopdf::Document::load_mem(bytes).map_err(|e| PdfDeckError::FileParse {
        detail: e.to_string(),
    })?;

    let page_map = doc.get_pages();
    let total_pages = page_map.len();
    info!("PDF loaded: {} pages ({})", total_pages, file_name);

    let mut pages = Vec::with_capacity(total_pages);
    for (position, &page_num) in page_map.keys().enumerate() {
        let text = match doc.extract_text(&[page_num]) {
            Ok(t) => t,
            Err(e) => {
                warn!("Page {}: text extraction failed: {}", page_num, e);
                String::new()
            }
        };
        debug!("Page {}: {} chars", page_num, text.chars().count());
        pages.push(PageText {
            page_number: position + 1,
            text,
        });
    }

    let metadata = read_metadata(&doc, total_pages);
    if let Some(ref t) = metadata.title {
        debug!("Title: {}", t);
    }
    if let Some(ref a) = metadata.author {
        debug!("Author: {}", a);
    }

    Ok(ExtractedDocument {
        document: Document {
            file_name,
            file_url,
            total_pages,
            metadata,
        },
        pages,
    })
}

/// Reject anything that does not start with `%PDF` before handing it to lopdf.
fn check_magic(bytes: &[u8]) -> Result<(), PdfDeckError> {
    if bytes.len() < 4 {
        return Err(PdfDeckError::FileParse {
            detail: format!("input is only {} bytes", bytes.len()),
        });
    }
    if &bytes[..4] != b"%PDF" {
        return Err(PdfDeckError::NotAPdf {
            magic: bytes[..4].to_vec(),
        });
    }
    Ok(())
}

/// Read the trailer `Info` dictionary. Missing entries become `None`.
fn read_metadata(doc: &lopdf::Document, page_count: usize) -> DocumentMetadata {
    let mut meta = DocumentMetadata {
        page_count,
        pdf_version: doc.version.clone(),
        ..Default::default()
    };

    let Some(info) = info_dictionary(doc) else {
        return meta;
    };

    let field = |key: &[u8]| -> Option<String> {
        let obj = info.get(key).ok()?;
        let obj = match obj {
            Object::Reference(id) => doc.get_object(*id).ok()?,
            other => other,
        };
        let raw = obj.as_str().ok()?;
        let text = decode_pdf_string(raw);
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    };

    meta.title = field(b"Title");
    meta.author = field(b"Author");
    meta.subject = field(b"Subject");
    meta.creator = field(b"Creator");
    meta.producer = field(b"Producer");
    meta
}

fn info_dictionary(doc: &lopdf::Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a BOM, otherwise
/// UTF-8 with a Latin-1 fallback.
fn decode_pdf_string(raw: &[u8]) -> String {
    if raw.len() >= 2 && raw[0] == 0xFE && raw[1] == 0xFF {
        let units: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_magic() {
        let err = parse_pdf_blocking(b"PK\x03\x04zip", "a.pdf".into(), "u".into()).unwrap_err();
        assert!(matches!(err, PdfDeckError::NotAPdf { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn rejects_truncated_input() {
        let err = parse_pdf_blocking(b"%P", "a.pdf".into(), "u".into()).unwrap_err();
        assert!(matches!(err, PdfDeckError::FileParse { .. }));
    }

    #[test]
    fn corrupt_pdf_is_a_parse_error() {
        let err = parse_pdf_blocking(b"%PDF-1.7\ngarbage", "a.pdf".into(), "u".into())
            .unwrap_err();
        assert!(matches!(err, PdfDeckError::FileParse { .. }), "got {err:?}");
    }

    #[test]
    fn decodes_utf16_and_latin1_strings() {
        let utf16 = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_string(&utf16), "Hi");
        assert_eq!(decode_pdf_string(b"Plain"), "Plain");
        assert_eq!(decode_pdf_string(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }
}
