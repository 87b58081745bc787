//! Markdown export of a summary deck.

use crate::error::PdfDeckError;
use crate::output::SummaryMetadata;
use std::path::Path;
use tracing::info;

/// Separator placed between slides in the exported file.
pub const SLIDE_SEPARATOR: &str = "\n\n---\n\n";

/// Render a deck as one markdown document.
///
/// Layout: `# {title}`, a blank line, metadata lines for the fields that are
/// present, a `---` rule, then the slides separated by rules. The result
/// ends with exactly one newline.
pub fn to_markdown(title: &str, slides: &[String], metadata: Option<&SummaryMetadata>) -> String {
    let mut md = format!("# {}\n\n", title.trim());

    if let Some(meta) = metadata {
        if !meta.file_name.is_empty() {
            md.push_str(&format!("**Source:** {}\n", meta.file_name));
        }
        if meta.page_count > 0 {
            md.push_str(&format!("**Pages:** {}\n", meta.page_count));
        }
        if meta.word_count > 0 {
            md.push_str(&format!("**Words:** {}\n", meta.word_count));
        }
        if meta.processing_time > 0 {
            md.push_str(&format!("**Processing Time:** {}ms\n", meta.processing_time));
        }
    }

    md.push_str("\n---\n\n");
    let body = slides
        .iter()
        .map(|s| s.trim())
        .collect::<Vec<_>>()
        .join(SLIDE_SEPARATOR);
    md.push_str(&body);

    let trimmed_len = md.trim_end().len();
    md.truncate(trimmed_len);
    md.push('\n');
    md
}

/// Download file name for a deck: the title lower-cased with every
/// non-alphanumeric character replaced by `_`, plus `.md`.
pub fn export_file_name(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.md", stem)
}

/// Write `markdown` to `path` atomically (temp file + rename).
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), PdfDeckError> {
    let write_err = |e: std::io::Error| PdfDeckError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} bytes to {}", markdown.len(), path.display());
    Ok(())
}
