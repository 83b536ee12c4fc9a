//! Text normalization for extracted PDF text
//!
//! Publisher PDFs produce wildly different whitespace noise: CRLF line
//! endings, form-feed page breaks, tab-indented option columns, hanging
//! indents on wrapped lines. Every pattern downstream assumes the canonical
//! form produced here, so this runs exactly once at the head of the pipeline.

use regex::Regex;
use std::sync::LazyLock;

static HORIZONTAL_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());
static LEADING_INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n +").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Canonicalize whitespace and line-break noise.
///
/// - CRLF and lone CR collapse to LF
/// - form feeds (page breaks) become a blank line
/// - tabs become single spaces
/// - runs of 2+ spaces collapse to one
/// - leading indentation on continuation lines is stripped
/// - runs of 3+ newlines collapse to exactly one blank line
///
/// Idempotent: `normalize(normalize(t)) == normalize(t)`.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let unified = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{0c}', "\n\n")
        .replace('\t', " ");

    let collapsed = HORIZONTAL_RUNS.replace_all(&unified, " ");
    let stripped = LEADING_INDENT.replace_all(&collapsed, "\n");
    BLANK_RUNS.replace_all(&stripped, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings_unified() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_form_feed_becomes_blank_line() {
        assert_eq!(normalize("page one\u{0c}page two"), "page one\n\npage two");
    }

    #[test]
    fn test_tabs_and_space_runs_collapse() {
        assert_eq!(normalize("a\tb"), "a b");
        assert_eq!(normalize("a    b"), "a b");
        // Tabs expand to spaces first, then the run collapses
        assert_eq!(normalize("a\t\tb"), "a b");
    }

    #[test]
    fn test_continuation_indent_stripped() {
        assert_eq!(normalize("1. A question\n   that wraps"), "1. A question\nthat wraps");
    }

    #[test]
    fn test_blank_runs_collapse_to_one_blank_line() {
        assert_eq!(normalize("a\n\n\n\n\nb"), "a\n\nb");
        // A single blank line is preserved (paragraph identity)
        assert_eq!(normalize("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_idempotent() {
        let messy = "Chapter 1\r\n\r\n\r\n\r\n1.\tWhat is\r\n    the answer?\u{0c}a.  yes\r\nb.\tno";
        let once = normalize(messy);
        assert_eq!(normalize(&once), once);
    }
}
