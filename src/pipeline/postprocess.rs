//! Post-processing: deterministic cleanup of model output.
//!
//! Two entry points:
//!
//! - [`strip_code_fences`] runs on the *whole* reply before JSON parsing.
//!   Models asked for "JSON only" still wrap it in ` ```json ... ``` `
//!   more often than not.
//! - [`tidy_slide`] runs on each slide's markdown after the reply has been
//!   parsed and every slide coerced to a string.
//!
//! Both are pure `&str -> String` functions; applying either twice gives the
//! same result as applying it once.

use once_cell::sync::Lazy;
use regex::Regex;

// ── Reply-level: code fences ─────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").expect("valid regex")
});

/// Remove one pair of surrounding code fences (any language tag).
///
/// Text that is not fenced is returned trimmed but otherwise unchanged.
pub fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

// ── Slide-level cleanup ──────────────────────────────────────────────────────

/// Normalise the whitespace of one slide:
///
/// 1. Line endings (CRLF / CR → LF)
/// 2. Invisible Unicode (zero-width spaces, BOM, soft hyphens) removed
/// 3. Trailing whitespace trimmed per line
/// 4. Runs of blank lines collapsed to one
/// 5. The whole slide trimmed
///
/// Markdown structure (headings, tables, lists) is left exactly as the model
/// wrote it.
pub fn tidy_slide(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        let raw = "```json\n{\"title\": \"T\", \"slides\": []}\n```";
        assert_eq!(strip_code_fences(raw), "{\"title\": \"T\", \"slides\": []}");
    }

    #[test]
    fn strips_bare_fences_and_surrounding_space() {
        assert_eq!(strip_code_fences("  ```\n{}\n```  \n"), "{}");
    }

    #[test]
    fn unfenced_text_passes_through() {
        assert_eq!(strip_code_fences(" {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fences("no fences here"), "no fences here");
    }

    #[test]
    fn tidy_normalises_whitespace() {
        let raw = "# Title  \r\nLine one\t\r\n\r\n\r\n\r\nLine two\u{200B}\n";
        assert_eq!(tidy_slide(raw), "# Title\nLine one\n\nLine two");
    }

    #[test]
    fn tidy_keeps_markdown_structure() {
        let raw = "Intro text\n## Details\n| A | B |\n| 1 | 2 |\n```\n# not a heading\n```";
        assert_eq!(tidy_slide(raw), raw);
    }

    #[test]
    fn tidy_is_idempotent() {
        let raw = "Text\n# Head\r\n| a | b |\n| c | d |\n\n\n\n- item  ";
        let once = tidy_slide(raw);
        assert_eq!(tidy_slide(&once), once);
    }
}
