//! Utility functions for text cleanup, timestamp parsing and logging.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace collapsing and HTML stripping for feed descriptions and page text
//! - Publish-date parsing for the loosely formatted timestamps feeds emit
//! - String truncation for logging

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Strip markup from an HTML fragment, keeping only its text.
///
/// Feed descriptions frequently carry inline HTML (`<p>`, `<img>`, links). The
/// result is the plain-text "snippet" with whitespace collapsed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
/// ```
pub fn strip_html(fragment: &str) -> String {
    if !fragment.contains('<') {
        return collapse_whitespace(fragment);
    }
    let parsed = Html::parse_fragment(fragment);
    let text = parsed.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// Join the non-empty parts with single spaces.
pub fn join_text_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a publish timestamp as feeds emit them.
///
/// RSS uses RFC 2822 (`Mon, 13 Oct 2025 09:30:00 GMT`), Atom uses RFC 3339, and
/// some sites emit a bare `YYYY-MM-DD HH:MM:SS` which is taken as UTC.
///
/// # Returns
///
/// `None` when none of the formats match.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backing off to a char boundary)
/// with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // Each Cyrillic letter is two bytes.
        let s = "Київ".repeat(10);
        let result = truncate_for_log(&s, 5);
        assert!(result.starts_with("Ки"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("plain   text"), "plain text");
        assert_eq!(strip_html("<img src=\"x.jpg\"/>"), "");
    }

    #[test]
    fn test_join_text_parts_skips_empty() {
        assert_eq!(join_text_parts(&["Title", "", " body "]), "Title body");
        assert_eq!(join_text_parts(&["", ""]), "");
    }

    #[test]
    fn test_parse_pub_date_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 10, 13, 9, 30, 0).unwrap();
        assert_eq!(
            parse_pub_date("Mon, 13 Oct 2025 09:30:00 GMT"),
            Some(expected)
        );
        assert_eq!(
            parse_pub_date("Mon, 13 Oct 2025 12:30:00 +0300"),
            Some(expected)
        );
        assert_eq!(parse_pub_date("2025-10-13T09:30:00Z"), Some(expected));
        assert_eq!(parse_pub_date("2025-10-13 09:30:00"), Some(expected));
        assert_eq!(parse_pub_date("not a date"), None);
        assert_eq!(parse_pub_date("  "), None);
    }
}
