// src/checker/extract.rs
// =============================================================================
// This module finds URLs inside free-form note text.
//
// The rule is purely lexical:
// - A URL starts with "http://" or "https://"
// - It continues through every character that is not whitespace,
//   '<', '>', '"' or '\''
// - Nothing else is validated here (the prober does real validation)
//
// Because it's cheap and has no side effects, the engine calls it on every
// reconciliation pass and the renderer calls it on every redraw.
//
// Rust concepts:
// - LazyLock: compile the regex once, on first use
// - Lifetimes: UrlSpan borrows from the text it was found in
// - Range<usize>: byte offsets into a &str
// =============================================================================

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

// The pattern allows an empty tail, so "https://" on its own is a match
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"']*"#).expect("URL pattern is valid"));

/// A URL found in a piece of text, together with where it was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlSpan<'a> {
    /// Byte range of the match inside the searched text
    pub start: usize,
    pub end: usize,
    /// The matched substring
    pub url: &'a str,
}

impl UrlSpan<'_> {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

// Extracts every URL from the text
//
// Parameters:
//   text: the note text to search (borrowed as &str)
//
// Returns: Vec<String> in left-to-right order, duplicates kept
//
// Example input:
//   "see https://a.dev and https://a.dev"
//
// Example output:
//   vec!["https://a.dev", "https://a.dev"]
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Same as [`extract_urls`] but keeps the byte positions of every match.
pub fn extract_spans(text: &str) -> Vec<UrlSpan<'_>> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| UrlSpan {
            start: m.start(),
            end: m.end(),
            url: m.as_str(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_in_order_with_duplicates() {
        let text = "b https://b.example a http://a.example again https://b.example";
        assert_eq!(
            extract_urls(text),
            vec!["https://b.example", "http://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_stops_at_delimiters() {
        let text = r#"<a href="https://x.dev/path?q=1">x</a> 'https://y.dev' https://z.dev>"#;
        assert_eq!(
            extract_urls(text),
            vec!["https://x.dev/path?q=1", "https://y.dev", "https://z.dev"]
        );
    }

    #[test]
    fn test_accepts_bare_scheme() {
        assert_eq!(extract_urls("just https:// here"), vec!["https://"]);
        assert_eq!(extract_urls("https://a"), vec!["https://a"]);
    }

    #[test]
    fn test_skips_other_schemes() {
        assert!(extract_urls("ftp://files.example mailto:me@example.com").is_empty());
        assert!(extract_urls("").is_empty());
    }

    #[test]
    fn test_newline_ends_a_url() {
        let text = "https://one.example\nhttps://two.example";
        assert_eq!(
            extract_urls(text),
            vec!["https://one.example", "https://two.example"]
        );
    }

    #[test]
    fn test_spans_point_back_into_text() {
        let text = "go to https://rust-lang.org now";
        let spans = extract_spans(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].range()], "https://rust-lang.org");
        assert_eq!(spans[0].start, 6);
    }
}
