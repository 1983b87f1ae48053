//! Regex-based syntax indexing for Python-ish code.
//!
//! Five independent passes run over the same snapshot of text and may emit
//! overlapping spans (a number inside a string gets both tags). Picking a
//! single tag per offset is the rendering layer's business, not ours.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Keyword,
    Str,
    Comment,
    Function,
    Number,
}

/// A highlight span in whole-buffer byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub category: Category,
    pub start: usize,
    pub end: usize,
}

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:def|class|import|from|return|if|else|elif|try|except|finally|for|while|in|is|None|True|False|and|or|not|with|as|break|continue|global|lambda)\b",
    )
    .expect("invalid keyword regex")
});

// Single-line only, no escape handling, mirroring the editor's tags.
static STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"\n]*"|'[^'\n]*'"#).expect("invalid string regex"));

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[^\n]*").expect("invalid comment regex"));

static FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"def\s+(\w+)\s*\(").expect("invalid function regex"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("invalid number regex"));

/// Index the whole buffer.
pub fn index(text: &str) -> Vec<HighlightSpan> {
    index_range(text, 0..text.len())
}

/// Index only `range` (e.g. the lines currently scrolled into view).
///
/// Spans are reported in whole-buffer coordinates. Out-of-bounds or
/// mid-codepoint range ends are snapped inward; indexing never fails.
pub fn index_range(text: &str, range: Range<usize>) -> Vec<HighlightSpan> {
    let start = snap_to_char_boundary(text, range.start.min(text.len()));
    let end = snap_to_char_boundary(text, range.end.min(text.len()));
    if start >= end {
        return Vec::new();
    }
    let slice = &text[start..end];

    let mut spans = Vec::new();
    for m in KEYWORD.find_iter(slice) {
        spans.push(span(Category::Keyword, start, m.start(), m.end()));
    }
    for m in STRING.find_iter(slice) {
        spans.push(span(Category::Str, start, m.start(), m.end()));
    }
    for m in COMMENT.find_iter(slice) {
        spans.push(span(Category::Comment, start, m.start(), m.end()));
    }
    for cap in FUNCTION.captures_iter(slice) {
        if let Some(name) = cap.get(1) {
            spans.push(span(Category::Function, start, name.start(), name.end()));
        }
    }
    for m in NUMBER.find_iter(slice) {
        spans.push(span(Category::Number, start, m.start(), m.end()));
    }
    spans
}

fn span(category: Category, base: usize, start: usize, end: usize) -> HighlightSpan {
    HighlightSpan {
        category,
        start: base + start,
        end: base + end,
    }
}

fn snap_to_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans_of(text: &str, category: Category) -> Vec<&str> {
        index(text)
            .into_iter()
            .filter(|s| s.category == category)
            .map(|s| &text[s.start..s.end])
            .collect()
    }

    #[test]
    fn def_foo_return_42() {
        let text = "def foo(x):\n    return 42";
        assert_eq!(spans_of(text, Category::Keyword), ["def", "return"]);
        assert_eq!(spans_of(text, Category::Function), ["foo"]);
        assert_eq!(spans_of(text, Category::Number), ["42"]);

        // The identifier `x` carries no span at all.
        let x_at = text.find("(x)").unwrap() + 1;
        for s in index(text) {
            assert!(
                s.end <= x_at || s.start > x_at,
                "{:?} overlaps the identifier x",
                s
            );
        }
    }

    #[test]
    fn keywords_are_whole_token_only() {
        let text = "definitely = classes + 1";
        assert!(spans_of(text, Category::Keyword).is_empty());
        assert_eq!(spans_of(text, Category::Number), ["1"]);
    }

    #[test]
    fn hash_inside_string_gets_both_tags() {
        let text = "x = \"# not a comment\"";
        let string_spans = spans_of(text, Category::Str);
        assert_eq!(string_spans, ["\"# not a comment\""]);
        // The comment pass runs over the same snapshot, so it still fires.
        let comment_spans = spans_of(text, Category::Comment);
        assert_eq!(comment_spans, ["# not a comment\""]);
    }

    #[test]
    fn number_inside_string_gets_both_tags() {
        let text = "s = 'take 5'";
        assert_eq!(spans_of(text, Category::Str), ["'take 5'"]);
        assert_eq!(spans_of(text, Category::Number), ["5"]);
    }

    #[test]
    fn strings_do_not_cross_lines() {
        let text = "a = \"open\nb = 1";
        assert!(spans_of(text, Category::Str).is_empty());
    }

    #[test]
    fn range_form_reports_buffer_coordinates() {
        let text = "pad\ndef foo():\n    pass\n";
        let start = text.find("def").unwrap();
        let spans = index_range(text, start..text.len());
        let def = spans
            .iter()
            .find(|s| s.category == Category::Keyword)
            .unwrap();
        assert_eq!(&text[def.start..def.end], "def");
        assert_eq!(def.start, start);
    }

    #[test]
    fn degenerate_ranges_are_empty() {
        assert!(index_range("abc", 2..2).is_empty());
        assert!(index_range("abc", 5..9).is_empty());
        assert!(index("").is_empty());
    }
}
