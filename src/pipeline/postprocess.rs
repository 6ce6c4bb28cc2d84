//! Post-processing: deterministic cleanup of recognized and model-generated text.
//!
//! Recognition backends leave artefacts that carry no content but do hurt
//! the translator and the layout renderer:
//!
//! - tesseract ends every page with a form feed (`\x0C`) and pads blocks
//!   with runs of blank lines
//! - scans converted on Windows come back with `\r\n` line endings
//! - vision models occasionally wrap the whole answer in ```` ``` ```` fences
//!   despite being told not to
//! - zero-width characters and soft hyphens survive OCR and confuse the
//!   translator's sentence splitting
//!
//! Each rule is a pure `&str → String` function so it can be tested alone.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean OCR output into the text sent to a translator. The recognized text
/// itself is kept as is; this only shapes the translator's input.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF/CR → LF) and drop form feeds
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 2+ consecutive blank lines down to 1
/// 5. Trim leading and trailing blank lines
pub fn clean_recognized_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

/// Clean text returned by an LLM backend: strip outer fences, then apply
/// [`clean_recognized_text`].
pub fn clean_model_text(input: &str) -> String {
    clean_recognized_text(&strip_model_fences(input))
}

// ── Rule: Strip outer code fences ────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n```\s*$").unwrap());

/// Remove a code fence wrapping the entire text, keeping its body.
pub fn strip_model_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\x0C', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tesseract_form_feed_removed() {
        assert_eq!(clean_recognized_text("Hello\nworld\n\x0C"), "Hello\nworld");
    }

    #[test]
    fn crlf_normalised() {
        assert_eq!(clean_recognized_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn blank_runs_collapse_to_paragraph_break() {
        assert_eq!(clean_recognized_text("one\n\n\n\n\ntwo"), "one\n\ntwo");
    }

    #[test]
    fn trailing_spaces_trimmed() {
        assert_eq!(clean_recognized_text("line   \nnext\t"), "line\nnext");
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(clean_recognized_text("при\u{00AD}вет\u{200B}"), "привет");
    }

    #[test]
    fn whitespace_only_becomes_empty() {
        assert_eq!(clean_recognized_text(" \n\n \x0C\n"), "");
    }

    #[test]
    fn fences_stripped() {
        assert_eq!(strip_model_fences("```\nПривет\n```"), "Привет");
        assert_eq!(strip_model_fences("```text\na\nb\n```\n"), "a\nb");
    }

    #[test]
    fn inner_fences_untouched() {
        let s = "before\n```\ncode\n```\nafter";
        assert_eq!(strip_model_fences(s), s);
    }

    #[test]
    fn model_text_cleaned() {
        assert_eq!(clean_model_text("```\nHello   \n\n\n\nBye\n```"), "Hello\n\nBye");
    }
}
